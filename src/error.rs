//! Error types for the cache layer
//!
//! Provides unified error handling using thiserror. `CacheError` covers the
//! store and its persistence; `RequestError` covers the request client and
//! the read-through facade.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Store-level failures. These never reach facade callers: the `Cache`
/// handle logs and counts them, then degrades to miss behavior.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Key is empty or exceeds the maximum length
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Value could not be converted to or from its cached form
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Persistent backing store failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid request data (admin API)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// TTL table violates short < medium < long
    #[error("Invalid TTL policy: {0}")]
    InvalidTtlPolicy(String),
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Storage(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidKey(_)
            | CacheError::InvalidRequest(_)
            | CacheError::InvalidTtlPolicy(_) => StatusCode::BAD_REQUEST,
            CacheError::Serialization(_) | CacheError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for store operations.
pub type Result<T> = std::result::Result<T, CacheError>;

// == Error Kind ==
/// Coarse classification of a request failure, used for retry decisions and
/// metrics events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Timeout,
    RateLimited,
    Server,
    Network,
    BadRequest,
    NotFound,
    PermissionDenied,
    Rejected,
    Validation,
    Decode,
    Fetch,
}

// == Request Error Enum ==
/// Failure of a logical request or fetcher.
///
/// `Clone` so one failed fetch can be handed to every caller sharing it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RequestError {
    /// Request exceeded its timeout
    #[error("Request to {target} timed out after {timeout_ms}ms")]
    Timeout { target: String, timeout_ms: u64 },

    /// Backend asked us to slow down
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Backend failed (5xx equivalent)
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Connection could not be established or was dropped
    #[error("Network error: {0}")]
    Network(String),

    /// Malformed arguments
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not allowed to perform the request
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// An interceptor refused the request
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// A response interceptor refused the payload
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Payload could not be decoded into the requested type
    #[error("Decode error: {0}")]
    Decode(String),

    /// Any other failure raised by a fetcher
    #[error("Fetch failed: {0}")]
    Fetch(String),
}

impl RequestError {
    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RequestError::Timeout { .. } => ErrorKind::Timeout,
            RequestError::RateLimited(_) => ErrorKind::RateLimited,
            RequestError::Server { .. } => ErrorKind::Server,
            RequestError::Network(_) => ErrorKind::Network,
            RequestError::BadRequest(_) => ErrorKind::BadRequest,
            RequestError::NotFound(_) => ErrorKind::NotFound,
            RequestError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            RequestError::Rejected(_) => ErrorKind::Rejected,
            RequestError::Validation(_) => ErrorKind::Validation,
            RequestError::Decode(_) => ErrorKind::Decode,
            RequestError::Fetch(_) => ErrorKind::Fetch,
        }
    }

    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Timeout | ErrorKind::RateLimited | ErrorKind::Server | ErrorKind::Network
        )
    }

    /// Maps an HTTP status and body message onto the error taxonomy.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            429 => RequestError::RateLimited(message),
            401 | 403 => RequestError::PermissionDenied(message),
            404 => RequestError::NotFound(message),
            408 => RequestError::Timeout {
                target: message,
                timeout_ms: 0,
            },
            500..=599 => RequestError::Server { status, message },
            _ => RequestError::BadRequest(message),
        }
    }
}

impl From<serde_json::Error> for RequestError {
    fn from(err: serde_json::Error) -> Self {
        RequestError::Decode(err.to_string())
    }
}

impl From<anyhow::Error> for RequestError {
    fn from(err: anyhow::Error) -> Self {
        RequestError::Fetch(format!("{err:#}"))
    }
}
