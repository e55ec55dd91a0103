use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Why a single upstream attempt failed. Never shown to callers directly.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AttemptError {
    /// Timeout, refused connection, TLS failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Upstream answered with a non-2xx status.
    #[error("upstream returned {status}: {body}")]
    Rejected { status: u16, body: String },

    /// 2xx with a body that is not JSON.
    #[error("invalid upstream payload: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("SMTP credentials are not configured")]
    NotConfigured,

    #[error("invalid address: {0}")]
    Address(String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("SMTP error: {0}")]
    Smtp(String),

    #[error("mail transport panicked")]
    Panicked,
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("rate limit exceeded, try again later")]
    Throttled,

    #[error("session creation failed after {attempts} attempts: {last_error}")]
    UpstreamExhausted {
        attempts: u32,
        last_error: AttemptError,
    },

    #[error("email delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("mail queue is closed")]
    QueueClosed,

    #[error("mail queue is full, try again later")]
    QueueFull,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::Throttled => StatusCode::TOO_MANY_REQUESTS,
            RelayError::QueueFull => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            RelayError::UpstreamExhausted { last_error, .. } => Some(last_error.to_string()),
            RelayError::Delivery(e) => Some(e.to_string()),
            _ => None,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
            details: self.details(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
