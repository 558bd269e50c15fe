use crate::config::OpenWeatherConfig;
use crate::error::ApiError;
use crate::forecast::ForecastSource;
use crate::types::CitySuggestion;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Client for the geocoding/forecast upstream. The gateway's only job on
/// these routes is credential injection and relay; forecast bodies stay
/// opaque.
pub struct OpenWeatherClient {
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl OpenWeatherClient {
    pub fn from_config(config: &OpenWeatherConfig) -> Result<Self> {
        Ok(Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            client: super::http_client(config.timeout_secs)?,
        })
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    fn api_key(&self) -> Result<&str, ApiError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ApiError::MissingCredential("OPENWEATHER_API_KEY"))
    }

    pub async fn city_suggestions(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<CitySuggestion>, ApiError> {
        let api_key = self.api_key()?;

        let url = format!("{}/geo/1.0/direct", self.base_url);
        let res = self
            .client
            .get(&url)
            .query(&[
                ("q", query),
                ("limit", &limit.to_string()),
                ("appid", api_key),
            ])
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let details = res.json::<Value>().await.unwrap_or(Value::Null);
            crate::metrics::METRICS
                .upstream_errors_total
                .with_label_values(&["openweather"])
                .inc();

            return Err(ApiError::UpstreamStatus {
                context: "OpenWeather geocoding failed",
                status: status.as_u16(),
                details,
            });
        }

        let body: Value = res.json().await.map_err(|e| {
            ApiError::Internal(format!("Failed to parse geocoding response: {}", e))
        })?;

        // A non-array body maps to no suggestions; each entry falls back to
        // field defaults rather than dropping the whole list.
        let suggestions = body
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| serde_json::from_value(entry.clone()).unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default();

        Ok(suggestions)
    }

    pub async fn forecast(&self, lat: f64, lon: f64) -> Result<Value, ApiError> {
        let api_key = self.api_key()?;

        let url = format!("{}/data/2.5/forecast", self.base_url);
        let res = self
            .client
            .get(&url)
            .query(&[
                ("lat", lat.to_string().as_str()),
                ("lon", lon.to_string().as_str()),
                ("units", "metric"),
                ("appid", api_key),
            ])
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let details = res.json::<Value>().await.unwrap_or(Value::Null);
            crate::metrics::METRICS
                .upstream_errors_total
                .with_label_values(&["openweather"])
                .inc();

            return Err(ApiError::UpstreamStatus {
                context: "OpenWeather forecast failed",
                status: status.as_u16(),
                details,
            });
        }

        res.json()
            .await
            .map_err(|e| ApiError::Internal(format!("Failed to parse forecast response: {}", e)))
    }
}

#[async_trait]
impl ForecastSource for OpenWeatherClient {
    async fn fetch(&self, lat: f64, lon: f64) -> Result<Value> {
        Ok(self.forecast(lat, lon).await?)
    }
}
