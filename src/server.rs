use crate::client_id::client_key;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::ApiError;
use crate::providers::{GeminiClient, OpenWeatherClient};
use crate::quota::DailyQuota;
use crate::rate_limit::RateLimiter;
use crate::types::{CitySuggestion, SummaryRequest, SummaryText};
use anyhow::Result;
use axum::{
    Json, Router,
    extract::{ConnectInfo, Query, State},
    http::HeaderMap,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// HTTP server state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub gemini: Arc<GeminiClient>,
    pub openweather: Arc<OpenWeatherClient>,
    pub rate_limiter: Arc<RateLimiter>,
    pub quota: Arc<DailyQuota>,
}

impl AppState {
    /// Production wiring: one quota map and one rate-limiter map per server
    /// process, both on the wall clock. Scaling past one instance needs an
    /// external shared store behind the same interfaces.
    pub fn from_config(config: Config) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let gemini = Arc::new(GeminiClient::from_config(&config.upstream.gemini)?);
        let openweather = Arc::new(OpenWeatherClient::from_config(&config.upstream.openweather)?);

        let rate_limiter = Arc::new(RateLimiter::new(
            config.rate_limiting.max_requests,
            config.rate_limiting.window_secs,
            clock.clone(),
        ));
        let quota = Arc::new(DailyQuota::new(config.quota.daily_limit, clock));

        Ok(Self {
            config: Arc::new(config),
            gemini,
            openweather,
            rate_limiter,
            quota,
        })
    }
}

/// Build the route table; split out so tests can drive the router without
/// binding a socket.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_handler))
        // Metrics (Prometheus)
        .route("/metrics", get(metrics_handler))
        // Geocoding pass-through
        .route("/api/citySuggestions", get(city_suggestions_handler))
        // Forecast pass-through (cached client-side, not here)
        .route("/api/forecast", get(forecast_handler))
        // Metered AI summary route
        .route("/api/geminiWeather", post(gemini_weather_handler))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start HTTP server
pub async fn serve(config: Config) -> Result<()> {
    let bind = config.server.bind.clone();
    let state = AppState::from_config(config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("✓ HTTP server listening on {}", bind);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn record_request(endpoint: &str, started: Instant, status: u16) {
    crate::metrics::METRICS
        .request_duration_seconds
        .with_label_values(&[endpoint])
        .observe(started.elapsed().as_secs_f64());
    crate::metrics::METRICS
        .requests_total
        .with_label_values(&[endpoint, &status.to_string()])
        .inc();
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let mut upstreams = Vec::new();
    if state.openweather.has_credentials() {
        upstreams.push("openweather");
    }
    if state.gemini.has_credentials() {
        upstreams.push("gemini");
    }

    Json(json!({
        "status": "healthy",
        "version": crate::VERSION,
        "upstreams": upstreams,
    }))
}

/// GET /metrics (Prometheus format)
async fn metrics_handler() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = crate::metrics::METRICS.registry.gather();

    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }

    String::from_utf8(buffer).unwrap_or_default()
}

#[derive(Debug, Deserialize)]
struct SuggestionsQuery {
    q: Option<String>,
    limit: Option<u32>,
}

/// GET /api/citySuggestions - geocoding pass-through with credential
/// injection; no gating.
async fn city_suggestions_handler(
    State(state): State<AppState>,
    Query(params): Query<SuggestionsQuery>,
) -> Result<Json<Vec<CitySuggestion>>, ApiError> {
    let started = Instant::now();
    let query = params.q.unwrap_or_default().trim().to_string();
    let limit = params.limit.unwrap_or(3);

    let result = state.openweather.city_suggestions(&query, limit).await;

    let status = match &result {
        Ok(_) => 200,
        Err(e) => e.status().as_u16(),
    };
    record_request("city_suggestions", started, status);

    result.map(Json)
}

#[derive(Debug, Deserialize)]
struct ForecastQuery {
    lat: Option<f64>,
    lon: Option<f64>,
}

/// GET /api/forecast - forecast pass-through. Freshness caching lives on
/// the client side; the server only injects credentials and relays.
async fn forecast_handler(
    State(state): State<AppState>,
    Query(params): Query<ForecastQuery>,
) -> Result<Json<Value>, ApiError> {
    let started = Instant::now();

    let (lat, lon) = match (params.lat, params.lon) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => {
            record_request("forecast", started, 400);
            return Err(ApiError::BadRequest("Missing lat/lon".to_string()));
        }
    };

    let result = state.openweather.forecast(lat, lon).await;

    let status = match &result {
        Ok(_) => 200,
        Err(e) => e.status().as_u16(),
    };
    record_request("forecast", started, status);

    result.map(Json)
}

/// POST /api/geminiWeather - the metered route: window limiter, then daily
/// quota, then the upstream call. The two denial reasons stay distinct, and
/// a slot spent on a failed upstream call is not refunded.
async fn gemini_weather_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<SummaryRequest>,
) -> Result<Json<SummaryText>, ApiError> {
    let started = Instant::now();
    let client = client_key(&headers, Some(addr.ip()));

    let result = admit_and_generate(&state, &client, payload).await;

    let status = match &result {
        Ok(_) => 200,
        Err(e) => e.status().as_u16(),
    };
    record_request("gemini_weather", started, status);

    result.map(Json)
}

async fn admit_and_generate(
    state: &AppState,
    client: &str,
    payload: SummaryRequest,
) -> Result<SummaryText, ApiError> {
    if !state.rate_limiter.admit(client) {
        crate::metrics::METRICS
            .rate_limit_exceeded_total
            .with_label_values(&["gemini_weather"])
            .inc();
        return Err(ApiError::RateLimited);
    }

    // Validation runs before the quota so a malformed request never burns
    // a daily slot.
    let weather = payload
        .weather
        .ok_or_else(|| ApiError::BadRequest("Missing weather payload".to_string()))?;

    let decision = state.quota.consume(client);
    if !decision.allowed {
        crate::metrics::METRICS
            .quota_exhausted_total
            .with_label_values(&["gemini_weather"])
            .inc();
        return Err(ApiError::QuotaExhausted);
    }

    let text = state.gemini.weather_summary(&weather).await?;

    Ok(SummaryText { text })
}
