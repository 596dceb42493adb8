use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Message returned for every failed capability-token check. It is the same
/// whichever part of the (store, delivery, token) triple did not match.
pub const INVALID_LINK_MESSAGE: &str = "invalid or expired link";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{INVALID_LINK_MESSAGE}")]
    InvalidLink,

    #[error("no courier available")]
    NoAvailableCouriers,

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::Conflict(_) => "conflict",
            AppError::NotFound(_) => "not_found",
            AppError::InvalidLink => "invalid_link",
            AppError::NoAvailableCouriers => "no_courier_available",
            AppError::Internal(_) => "internal",
        }
    }

    /// Whether the caller may retry the same request later and expect a
    /// different outcome without changing its input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::NoAvailableCouriers | AppError::Internal(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::InvalidLink => (StatusCode::NOT_FOUND, INVALID_LINK_MESSAGE.to_string()),
            AppError::NoAvailableCouriers => (
                StatusCode::SERVICE_UNAVAILABLE,
                "no courier available".to_string(),
            ),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
        };

        let body = Json(json!({
            "error": message,
            "kind": self.kind(),
            "retryable": self.is_retryable(),
        }));

        (status, body).into_response()
    }
}
