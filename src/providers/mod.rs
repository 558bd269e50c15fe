pub mod gemini;
pub mod openweather;

pub use gemini::GeminiClient;
pub use openweather::OpenWeatherClient;

use std::time::Duration;

/// Shared client construction: every upstream call is bounded by a fixed
/// request timeout so a stalled provider surfaces as an upstream failure
/// instead of hanging the caller.
pub(crate) fn http_client(timeout_secs: u64) -> anyhow::Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}
