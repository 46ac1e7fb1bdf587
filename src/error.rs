//! Error types for the logo comparison service
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Logo Error Enum ==
/// Unified error type for fetching, decoding and comparing logos.
#[derive(Error, Debug)]
pub enum LogoError {
    /// Transport failure or non-2xx response status
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    /// Response succeeded but carried a zero-length body
    #[error("Empty resource: {0}")]
    EmptyResource(String),

    /// Bytes are not a decodable image (or not a valid data URI)
    #[error("Decode error: {0}")]
    Decode(String),

    /// Two fingerprints of different lengths were compared
    #[error("Fingerprint length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    /// The cache store rejected a write
    #[error("Cache write rejected: {0}")]
    CacheWrite(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Cache snapshot could not be read or written
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LogoError {
    /// Builds a network error for the given URL.
    pub fn network(url: impl Into<String>, message: impl Into<String>) -> Self {
        LogoError::Network {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Returns true for failures worth another fetch attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, LogoError::Network { .. } | LogoError::EmptyResource(_))
    }
}

impl From<image::ImageError> for LogoError {
    fn from(err: image::ImageError) -> Self {
        LogoError::Decode(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for LogoError {
    fn into_response(self) -> Response {
        let status = match &self {
            LogoError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            LogoError::Network { .. } | LogoError::EmptyResource(_) => StatusCode::BAD_GATEWAY,
            LogoError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            LogoError::CacheWrite(_) => StatusCode::INSUFFICIENT_STORAGE,
            LogoError::LengthMismatch { .. } | LogoError::Snapshot(_) | LogoError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the service.
pub type Result<T> = std::result::Result<T, LogoError>;
