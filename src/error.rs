/// Gateway response taxonomy
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use thiserror::Error;

/// Every non-success outcome a route can produce. Admission denials are
/// expected outcomes with their own user-facing messages; the two denial
/// reasons are never conflated. Upstream failures are relayed with enough
/// detail for the caller to decide whether to retry; the gateway itself
/// never retries.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The sliding-window limiter rejected the request ("slow down").
    #[error("Rate limit reached.")]
    RateLimited,

    /// The daily allowance is spent ("come back tomorrow").
    #[error("out of tries for today")]
    QuotaExhausted,

    /// A required upstream credential is not configured; the route fails
    /// closed without attempting the call.
    #[error("Server missing {0}")]
    MissingCredential(&'static str),

    /// Malformed request, rejected before any upstream call.
    #[error("{0}")]
    BadRequest(String),

    /// The upstream answered with a non-success status; relayed as-is.
    #[error("{context}")]
    UpstreamStatus {
        context: &'static str,
        status: u16,
        details: Value,
    },

    /// Network error or timeout reaching the upstream.
    #[error("Server error")]
    Internal(String),
}

impl ApiError {
    /// Status code this error maps to on the wire.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::RateLimited | ApiError::QuotaExhausted => StatusCode::TOO_MANY_REQUESTS,
            ApiError::MissingCredential(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::UpstreamStatus { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::RateLimited => json!({
                "error": "Rate limit reached.",
                "hint": "Try again in a few minutes."
            }),
            ApiError::QuotaExhausted => json!({
                "error": "out of tries for today",
                "hint": "The daily allowance resets at midnight UTC."
            }),
            ApiError::MissingCredential(name) => {
                json!({ "error": format!("Server missing {}", name) })
            }
            ApiError::BadRequest(message) => json!({ "error": message }),
            ApiError::UpstreamStatus {
                context, details, ..
            } => json!({ "error": context, "details": details }),
            ApiError::Internal(details) => {
                json!({ "error": "Server error", "details": details })
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Internal(e.to_string())
    }
}
