use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub forecast_cache: ForecastCacheConfig,
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpstreamConfig {
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub openweather: OpenWeatherConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_gemini_url")]
    pub base_url: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_gemini_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenWeatherConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_openweather_url")]
    pub base_url: String,
    #[serde(default = "default_openweather_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastCacheConfig {
    #[serde(default = "default_max_age_minutes")]
    pub max_age_minutes: i64,
    #[serde(default = "default_coord_precision")]
    pub coord_precision: usize,
    #[serde(default = "default_cache_dir")]
    pub dir: String,
    #[serde(default)]
    pub strict_clock_skew: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

// Defaults
fn default_bind() -> String { "0.0.0.0:5050".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_gemini_url() -> String { "https://generativelanguage.googleapis.com".to_string() }
fn default_gemini_model() -> String { "gemini-2.0-flash".to_string() }
fn default_gemini_timeout() -> u64 { 30 }
fn default_openweather_url() -> String { "https://api.openweathermap.org".to_string() }
fn default_openweather_timeout() -> u64 { 10 }
fn default_max_age_minutes() -> i64 { 20 }
fn default_coord_precision() -> usize { 3 }
fn default_cache_dir() -> String { "./stratus-cache".to_string() }
fn default_max_requests() -> u32 { 10 }
fn default_window_secs() -> u64 { 600 }
fn default_daily_limit() -> u32 { 3 }
fn default_true() -> bool { true }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            log_level: default_log_level(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_gemini_url(),
            model: default_gemini_model(),
            timeout_secs: default_gemini_timeout(),
        }
    }
}

impl Default for OpenWeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_openweather_url(),
            timeout_secs: default_openweather_timeout(),
        }
    }
}

impl Default for ForecastCacheConfig {
    fn default() -> Self {
        Self {
            max_age_minutes: default_max_age_minutes(),
            coord_precision: default_coord_precision(),
            dir: default_cache_dir(),
            strict_clock_skew: false,
        }
    }
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            daily_limit: default_daily_limit(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let config_path = env::var("STRATUS_CONFIG").unwrap_or_else(|_| {
            let home_config = format!(
                "{}/.config/stratus/config.toml",
                env::var("HOME").unwrap_or_default()
            );
            let locations = vec![
                "./stratus.toml",
                "./config.toml",
                "/etc/stratus/config.toml",
                home_config.as_str(),
            ];

            for path in locations {
                if Path::new(path).exists() {
                    return path.to_string();
                }
            }

            "./stratus.toml".to_string()
        });

        // The original deployment ran from environment variables alone, so a
        // missing config file is not an error.
        let mut config = if Path::new(&config_path).exists() {
            let content = fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {}", config_path))?;
            Self::from_toml(&content)
                .with_context(|| format!("Failed to parse config file: {}", config_path))?
        } else {
            Config::default()
        };

        config.apply_env_fallbacks();

        Ok(config)
    }

    /// Parse TOML content after substituting environment variables
    pub fn from_toml(content: &str) -> Result<Self> {
        let content = Self::substitute_env_vars(content);
        Ok(toml::from_str(&content)?)
    }

    /// Substitute ${VAR_NAME} with environment variable values
    fn substitute_env_vars(content: &str) -> String {
        let mut result = content.to_string();

        while let Some(start) = result.find("${") {
            if let Some(end) = result[start..].find('}') {
                let var_name = &result[start + 2..start + end];
                let value = env::var(var_name).unwrap_or_default();
                result.replace_range(start..start + end + 1, &value);
            } else {
                break;
            }
        }

        result
    }

    /// Fill upstream keys from the conventional environment variables when
    /// the config file does not carry them.
    fn apply_env_fallbacks(&mut self) {
        if self.upstream.gemini.api_key.is_none() {
            self.upstream.gemini.api_key = non_empty_env("GEMINI_API_KEY");
        }
        if self.upstream.openweather.api_key.is_none() {
            self.upstream.openweather.api_key = non_empty_env("OPENWEATHER_API_KEY");
        }
    }

    /// Logged once at startup; the affected routes still fail closed per
    /// request rather than crashing the process.
    pub fn warn_missing_credentials(&self) {
        if self.upstream.gemini.api_key.is_none() {
            tracing::warn!("Missing GEMINI_API_KEY - the summary route will fail closed");
        }
        if self.upstream.openweather.api_key.is_none() {
            tracing::warn!("Missing OPENWEATHER_API_KEY - forecast routes will fail closed");
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}
