// Gateway tests - drive the router in-process, no sockets.
// Upstream-dependent paths use mockito; admission paths need no upstream.

use axum::Router;
use axum::body::Body;
use axum::extract::connect_info::ConnectInfo;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use std::net::SocketAddr;
use stratus::config::Config;
use stratus::server::{AppState, build_router};
use tower::ServiceExt;

fn test_router(mutate: impl FnOnce(&mut Config)) -> Router {
    let mut config = Config::default();
    mutate(&mut config);
    build_router(AppState::from_config(config).unwrap())
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    let mut request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))));
    request
}

fn summary_request(forwarded_for: &str, body: Value) -> Request<Body> {
    let mut request = Request::builder()
        .method("POST")
        .uri("/api/geminiWeather")
        .header("content-type", "application/json")
        .header("x-forwarded-for", forwarded_for)
        .body(Body::from(body.to_string()))
        .unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))));
    request
}

fn weather_body() -> Value {
    json!({
        "weather": {
            "temp": 20.4,
            "feels_like": 19.1,
            "description": "clear sky",
            "wind_speed": 3.5
        }
    })
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_router(|_| {});

    let (status, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_metrics_endpoint_serves_text() {
    let app = test_router(|_| {});

    let response = app.clone().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_forecast_requires_coordinates() {
    let app = test_router(|_| {});

    let (status, body) = send(&app, get("/api/forecast?lat=43.651")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing lat/lon");
}

#[tokio::test]
async fn test_forecast_fails_closed_without_credentials() {
    let app = test_router(|_| {});

    let (status, body) = send(&app, get("/api/forecast?lat=43.651&lon=-79.347")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Server missing OPENWEATHER_API_KEY");
}

#[tokio::test]
async fn test_city_suggestions_fails_closed_without_credentials() {
    let app = test_router(|_| {});

    let (status, body) = send(&app, get("/api/citySuggestions?q=Toronto")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Server missing OPENWEATHER_API_KEY");
}

#[tokio::test]
async fn test_summary_requires_weather_payload() {
    let app = test_router(|_| {});

    let (status, body) = send(&app, summary_request("203.0.113.7", json!({}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing weather payload");
}

#[tokio::test]
async fn test_summary_fails_closed_without_credentials() {
    let app = test_router(|_| {});

    let (status, body) = send(&app, summary_request("203.0.113.7", weather_body())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Server missing GEMINI_API_KEY");
}

#[tokio::test]
async fn test_denial_categories_are_distinguishable() {
    // Window limiter rejection: "slow down".
    let rate_app = test_router(|c| c.rate_limiting.max_requests = 0);
    let (rate_status, rate_body) =
        send(&rate_app, summary_request("203.0.113.7", weather_body())).await;

    // Quota rejection: "come back tomorrow".
    let quota_app = test_router(|c| c.quota.daily_limit = 0);
    let (quota_status, quota_body) =
        send(&quota_app, summary_request("203.0.113.7", weather_body())).await;

    assert_eq!(rate_status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(quota_status, StatusCode::TOO_MANY_REQUESTS);

    assert_eq!(rate_body["error"], "Rate limit reached.");
    assert_eq!(quota_body["error"], "out of tries for today");
    assert_ne!(rate_body["error"], quota_body["error"]);
    assert_ne!(rate_body["hint"], quota_body["hint"]);
}

#[tokio::test]
async fn test_quota_slots_spent_on_failed_upstream_are_not_refunded() {
    // No credential configured: each admitted request burns a slot and then
    // fails closed. The slot stays spent.
    let app = test_router(|c| c.quota.daily_limit = 2);

    for _ in 0..2 {
        let (status, body) = send(&app, summary_request("203.0.113.7", weather_body())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Server missing GEMINI_API_KEY");
    }

    let (status, body) = send(&app, summary_request("203.0.113.7", weather_body())).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "out of tries for today");
}

#[tokio::test]
async fn test_malformed_payload_does_not_burn_quota() {
    let app = test_router(|c| c.quota.daily_limit = 1);

    // Malformed requests are rejected before the quota is consulted.
    for _ in 0..3 {
        let (status, _) = send(&app, summary_request("203.0.113.7", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    // The daily slot is still available.
    let (status, body) = send(&app, summary_request("203.0.113.7", weather_body())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Server missing GEMINI_API_KEY");
}

#[tokio::test]
async fn test_clients_are_rate_limited_independently() {
    let app = test_router(|c| c.rate_limiting.max_requests = 1);

    let (first, _) = send(&app, summary_request("203.0.113.7", weather_body())).await;
    assert_eq!(first, StatusCode::INTERNAL_SERVER_ERROR);

    let (second, body) = send(&app, summary_request("203.0.113.7", weather_body())).await;
    assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Rate limit reached.");

    // A different forwarded address is a different admission bucket.
    let (other, _) = send(&app, summary_request("198.51.100.9", weather_body())).await;
    assert_eq!(other, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_summary_success_relays_upstream_text() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("POST", "/v1beta/models/gemini-2.0-flash:generateContent")
        .match_header("x-goog-api-key", "test-key")
        .match_body(mockito::Matcher::Regex("Temperature: 20°C".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "Summary:\nA mild, clear day." }] }
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let url = server.url();
    let app = test_router(move |c| {
        c.upstream.gemini.api_key = Some("test-key".to_string());
        c.upstream.gemini.base_url = url;
    });

    let (status, body) = send(&app, summary_request("203.0.113.7", weather_body())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "Summary:\nA mild, clear day.");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_summary_relays_upstream_error_status() {
    let mut server = mockito::Server::new_async().await;

    server
        .mock("POST", "/v1beta/models/gemini-2.0-flash:generateContent")
        .with_status(403)
        .with_header("content-type", "application/json")
        .with_body(json!({"error": {"message": "key revoked"}}).to_string())
        .create_async()
        .await;

    let url = server.url();
    let app = test_router(move |c| {
        c.upstream.gemini.api_key = Some("test-key".to_string());
        c.upstream.gemini.base_url = url;
    });

    let (status, body) = send(&app, summary_request("203.0.113.7", weather_body())).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Gemini request failed");
    assert_eq!(body["details"]["error"]["message"], "key revoked");
}

#[tokio::test]
async fn test_forecast_passthrough_with_credential_injection() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("GET", "/data/2.5/forecast")
        .match_query(mockito::Matcher::AllOf(vec![
            mockito::Matcher::UrlEncoded("lat".into(), "43.651".into()),
            mockito::Matcher::UrlEncoded("lon".into(), "-79.347".into()),
            mockito::Matcher::UrlEncoded("units".into(), "metric".into()),
            mockito::Matcher::UrlEncoded("appid".into(), "owm-key".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"list": [{"main": {"temp": 4.2}}]}).to_string())
        .create_async()
        .await;

    let url = server.url();
    let app = test_router(move |c| {
        c.upstream.openweather.api_key = Some("owm-key".to_string());
        c.upstream.openweather.base_url = url;
    });

    let (status, body) = send(&app, get("/api/forecast?lat=43.651&lon=-79.347")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["list"][0]["main"]["temp"], 4.2);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_city_suggestions_maps_upstream_entries() {
    let mut server = mockito::Server::new_async().await;

    server
        .mock("GET", "/geo/1.0/direct")
        .match_query(mockito::Matcher::AllOf(vec![
            mockito::Matcher::UrlEncoded("q".into(), "Toronto".into()),
            mockito::Matcher::UrlEncoded("limit".into(), "3".into()),
            mockito::Matcher::UrlEncoded("appid".into(), "owm-key".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!([
                {"name": "Toronto", "country": "CA", "state": "Ontario", "lat": 43.65, "lon": -79.38},
                {"name": "Toronto", "country": "US", "lat": 41.9, "lon": -80.7}
            ])
            .to_string(),
        )
        .create_async()
        .await;

    let url = server.url();
    let app = test_router(move |c| {
        c.upstream.openweather.api_key = Some("owm-key".to_string());
        c.upstream.openweather.base_url = url;
    });

    let (status, body) = send(&app, get("/api/citySuggestions?q=Toronto")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["state"], "Ontario");
    // Missing fields map to empty strings, not omissions.
    assert_eq!(body[1]["state"], "");
    assert_eq!(body[1]["country"], "US");
}
