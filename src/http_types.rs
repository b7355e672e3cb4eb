//! Shared HTTP response types
//!
//! Error bodies and the mapping from engine errors to status codes.

use axum::{http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Standard error response format for HTTP API endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Error half of every handler result
pub type ApiError = (StatusCode, Json<ErrorResponse>);

impl ErrorResponse {
    /// Create a new error response with error code and message
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }

    /// Create an internal server error response
    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new("internal_server_error", message)
    }

    /// Create a bad request error response
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("bad_request", message)
    }
}

/// Validation failures are the caller's fault, everything else is ours
pub fn api_error(err: EngineError) -> ApiError {
    match err {
        EngineError::Validation(e) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::bad_request(e.to_string())),
        ),
        EngineError::Store(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::internal_server_error(format!("{e:#}"))),
        ),
    }
}

pub fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::bad_request(message)),
    )
}
