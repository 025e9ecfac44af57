//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use messaging::MessagingError;

/// API-level error type that maps to HTTP responses.
///
/// The HTTP boundary only validates shape and enqueues commands; domain and
/// saga failures never surface here; callers observe them by polling the
/// read models.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found (or not yet projected).
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// The broker rejected the command.
    Messaging(MessagingError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Messaging(err) => {
                tracing::error!(error = %err, "failed to enqueue command");
                (StatusCode::SERVICE_UNAVAILABLE, err.to_string())
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

impl From<MessagingError> for ApiError {
    fn from(err: MessagingError) -> Self {
        ApiError::Messaging(err)
    }
}
