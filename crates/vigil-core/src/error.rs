//! Error types for Vigil operations.
//!
//! This module defines [`VigilError`], the error enum shared by every Vigil
//! crate. Fetch failures are split into [`VigilError::NotFound`], which callers
//! treat as a terminal resource state, and [`VigilError::Request`], which is an
//! infrastructure failure that gets reported and retried on the next poll.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`VigilError`].
pub type Result<T> = std::result::Result<T, VigilError>;

/// Error type for all Vigil operations.
#[derive(Debug, Error)]
pub enum VigilError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration file is invalid YAML
    #[error("Invalid configuration at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    /// Configuration validation failed
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String },

    // =========================================================================
    // I/O Errors
    // =========================================================================
    /// Generic I/O error with context
    #[error("I/O error {operation}: {path}")]
    Io {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory creation failed
    #[error("Failed to create directory: {path}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // Parsing Errors
    // =========================================================================
    /// JSON parsing error
    #[error("JSON parse error in {context}: {message}")]
    JsonParse {
        context: String,
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // =========================================================================
    // Fetch Errors
    // =========================================================================
    /// The scope (workspace, runtime, bucket object) no longer exists
    #[error("Not found: {scope}")]
    NotFound { scope: String },

    /// Network or backend failure while fetching
    #[error("Request failed for {scope}: {message}")]
    Request { scope: String, message: String },

    /// Request did not complete in time
    #[error("Request for {scope} timed out after {timeout_secs}s")]
    Timeout { scope: String, timeout_secs: u64 },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Internal error (bug in Vigil)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl VigilError {
    /// Create an I/O error
    pub fn io(operation: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }

    /// Create a JSON parse error
    pub fn json_parse(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::JsonParse {
            context: context.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Create a not-found error for a scope
    pub fn not_found(scope: impl Into<String>) -> Self {
        Self::NotFound {
            scope: scope.into(),
        }
    }

    /// Create a request error
    pub fn request(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Request {
            scope: scope.into(),
            message: message.into(),
        }
    }

    /// Create a config validation error
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    // =========================================================================
    // Error classification helpers
    // =========================================================================

    /// Returns true if the remote scope is gone. This is a terminal state, not a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if the next poll may succeed where this one failed
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Request { .. } | Self::Timeout { .. })
    }

    /// Returns true if this is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigInvalid { .. } | Self::ConfigValidation { .. }
        )
    }

    /// Returns actionable guidance for the user
    pub fn guidance(&self) -> Option<&'static str> {
        match self {
            Self::ConfigInvalid { .. } => Some("Check YAML syntax in ~/.vigil/config.yaml"),
            Self::ConfigValidation { .. } => {
                Some("Fix the reported field in ~/.vigil/config.yaml or remove it to use the default")
            }
            Self::Timeout { .. } => Some("Raise api.timeout_secs if the backend is slow"),
            Self::Request { .. } => Some("Check network connectivity and the api.base_url setting"),
            _ => None,
        }
    }
}
