//! Error types for the HTTP client.

use thiserror::Error;
use vigil_core::VigilError;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Client could not be configured
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The scope does not exist (HTTP 404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Server error (transient, retryable)
    #[error("Server error ({status}): {body}")]
    ServerError { status: u16, body: String },

    /// Any other non-success status
    #[error("HTTP {status}: {body}")]
    ApiError { status: u16, body: String },

    /// Network timeout
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    /// A required field was missing from the resource
    #[error("Missing {field} for {resource}")]
    MissingField { resource: String, field: &'static str },

    /// JSON deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

impl ClientError {
    /// Classify an HTTP status code.
    pub fn from_http_status(status: u16, url: &str, body: &str) -> Self {
        match status {
            404 => ClientError::NotFound(url.to_string()),
            500 | 502 | 503 | 504 => ClientError::ServerError {
                status,
                body: body.to_string(),
            },
            _ => ClientError::ApiError {
                status,
                body: body.to_string(),
            },
        }
    }

    /// Check if this error is worth retrying on the next poll.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::ServerError { .. } | ClientError::Timeout(_) => true,
            ClientError::HttpError(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Convert into the core error type, naming the scope that was fetched.
    pub fn into_vigil(self, scope: impl Into<String>, timeout_secs: u64) -> VigilError {
        let scope = scope.into();
        match self {
            ClientError::NotFound(_) => VigilError::not_found(scope),
            ClientError::ConfigError(message) => VigilError::config_validation(message),
            ClientError::Timeout(secs) => VigilError::Timeout {
                scope,
                timeout_secs: secs,
            },
            ClientError::HttpError(e) if e.is_timeout() => VigilError::Timeout {
                scope,
                timeout_secs,
            },
            ClientError::JsonError(e) => VigilError::json_parse(scope, e),
            other => VigilError::request(scope, other.to_string()),
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
