//! Admission failures and their HTTP shape.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::metrics::{MALFORMED_BODY_TOTAL, PAYLOAD_TOO_LARGE_TOTAL, RATE_LIMITED_TOTAL};

pub const RATE_LIMITED_MESSAGE: &str = "Too many requests, please try again later.";

#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    /// Key exhausted its window.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Declared or measured body size over the ceiling.
    #[error("Payload too large: {received} bytes exceeds limit of {limit}")]
    PayloadTooLarge { limit: usize, received: u64 },

    /// Body within limits but unreadable or unparseable.
    #[error("Malformed body: {0}")]
    MalformedBody(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type AdmissionResult<T> = Result<T, AdmissionError>;

impl AdmissionError {
    pub fn status(&self) -> StatusCode {
        match self {
            AdmissionError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AdmissionError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AdmissionError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            AdmissionError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AdmissionError::RateLimited { .. } => "rate_limited",
            AdmissionError::PayloadTooLarge { .. } => "payload_too_large",
            AdmissionError::MalformedBody(_) => "malformed_body",
            AdmissionError::NotFound(_) => "not_found",
        }
    }
}

impl From<serde_json::Error> for AdmissionError {
    fn from(err: serde_json::Error) -> Self {
        AdmissionError::MalformedBody(format!("invalid JSON: {err}"))
    }
}

/// 429 with a JSON error body and a `Retry-After` header.
pub fn rate_limit_response(retry_after_secs: u64) -> Response {
    let mut resp = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({ "error": RATE_LIMITED_MESSAGE })),
    )
        .into_response();
    resp.headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
    resp
}

impl IntoResponse for AdmissionError {
    fn into_response(self) -> Response {
        tracing::warn!(kind = self.kind(), error = %self, "request rejected");

        match self {
            AdmissionError::RateLimited { retry_after_secs } => {
                RATE_LIMITED_TOTAL.inc();
                rate_limit_response(retry_after_secs)
            }
            other => {
                match other {
                    AdmissionError::PayloadTooLarge { .. } => PAYLOAD_TOO_LARGE_TOTAL.inc(),
                    AdmissionError::MalformedBody(_) => MALFORMED_BODY_TOTAL.inc(),
                    _ => {}
                }
                let status = other.status();
                (status, Json(json!({ "error": other.to_string() }))).into_response()
            }
        }
    }
}
