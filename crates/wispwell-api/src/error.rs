//! Wispwell: API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use wispwell_core::error::SceneError;

/// Startup and runtime errors for the host processes.
#[derive(Debug, Error)]
pub enum AppError {
    /// An environment variable is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// A scene store could not be opened.
    #[error("storage error: {0}")]
    Storage(#[from] SceneError),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around `SceneError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub SceneError);

impl From<SceneError> for ApiError {
    fn from(err: SceneError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self.0 {
            SceneError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            SceneError::MalformedGraph(_) => (StatusCode::UNPROCESSABLE_ENTITY, "malformed_graph"),
            SceneError::InvalidState(_) => (StatusCode::CONFLICT, "invalid_state"),
            SceneError::Conflict { .. } => (StatusCode::CONFLICT, "concurrency_conflict"),
            SceneError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_failure"),
            SceneError::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, "cancelled"),
        };

        let body = ErrorBody {
            error: error_code,
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
