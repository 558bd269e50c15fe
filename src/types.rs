use serde::{Deserialize, Serialize};

/// The four weather fields a caller may feed into a summary request. These
/// are the only caller-supplied values that ever reach the upstream prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherReading {
    pub temp: f64,
    pub feels_like: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub wind_speed: f64,
}

/// Body of the metered summary route.
#[derive(Debug, Clone, Deserialize)]
pub struct SummaryRequest {
    pub weather: Option<WeatherReading>,
}

/// Successful summary response relayed to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryText {
    pub text: String,
}

/// One geocoding match, mapped from the upstream body with empty-string
/// defaults so partial entries still relay cleanly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CitySuggestion {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lon: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weather_reading_defaults() {
        let reading: WeatherReading =
            serde_json::from_str(r#"{"temp": 20.5, "feels_like": 19.0}"#).unwrap();

        assert_eq!(reading.description, "");
        assert_eq!(reading.wind_speed, 0.0);
    }

    #[test]
    fn test_summary_request_without_weather() {
        let request: SummaryRequest = serde_json::from_str("{}").unwrap();
        assert!(request.weather.is_none());
    }

    #[test]
    fn test_city_suggestion_partial_entry() {
        let suggestion: CitySuggestion =
            serde_json::from_str(r#"{"name": "Toronto", "lat": 43.65, "lon": -79.38}"#).unwrap();

        assert_eq!(suggestion.name, "Toronto");
        assert_eq!(suggestion.country, "");
        assert_eq!(suggestion.state, "");
    }
}
