use crate::config::GeminiConfig;
use crate::error::ApiError;
use crate::types::WeatherReading;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Client for the generative-text upstream. The prompt is a fixed,
/// server-controlled template; only the four weather fields from the caller
/// ever reach it.
pub struct GeminiClient {
    api_key: Option<String>,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

// Gemini API types
#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Deserialize, Debug)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Deserialize, Debug)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Deserialize, Debug)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiTextPart>,
}

#[derive(Deserialize, Debug)]
struct GeminiTextPart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    pub fn from_config(config: &GeminiConfig) -> Result<Self> {
        Ok(Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            client: super::http_client(config.timeout_secs)?,
        })
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    fn build_prompt(weather: &WeatherReading) -> String {
        format!(
            "You are a helpful weather assistant.\n\
             \n\
             Current conditions:\n\
             Temperature: {}°C\n\
             Feels like: {}°C\n\
             Weather: {}\n\
             Wind speed: {} m/s\n\
             \n\
             Respond EXACTLY in this format:\n\
             \n\
             Summary:\n\
             <Summarize the weather in 1 sentence. Do not exactly repeat the input data.>\n\
             \n\
             <Suggest an activity or two to do in this weather. Keep it brief.>\n\
             \n\
             <Suggest what to bring (e.g., clothing, accessories) in this weather. Keep it brief.>\n\
             \n\
             Sound cheerful!",
            weather.temp.round() as i64,
            weather.feels_like.round() as i64,
            weather.description,
            weather.wind_speed,
        )
    }

    /// Generates a summary for the given reading. Credentials are re-checked
    /// per call; a missing key fails closed without attempting the request.
    pub async fn weather_summary(&self, weather: &WeatherReading) -> Result<String, ApiError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ApiError::MissingCredential("GEMINI_API_KEY"))?;

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: Self::build_prompt(weather),
                }],
            }],
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let res = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let details = res.json::<Value>().await.unwrap_or(Value::Null);
            crate::metrics::METRICS
                .upstream_errors_total
                .with_label_values(&["gemini"])
                .inc();

            return Err(ApiError::UpstreamStatus {
                context: "Gemini request failed",
                status: status.as_u16(),
                details,
            });
        }

        let body: GeminiResponse = res
            .json()
            .await
            .map_err(|e| ApiError::Internal(format!("Failed to parse Gemini response: {}", e)))?;

        let text = body
            .candidates
            .as_ref()
            .and_then(|candidates| candidates.first())
            .and_then(|c| c.content.as_ref())
            .and_then(|content| content.parts.first())
            .map(|part| part.text.clone())
            .unwrap_or_default();

        Ok(text)
    }
}
