//! Error types for the Cherry Servers provider
//!
//! This module defines all error types used throughout the crate.

use crate::context::CancelCause;
use crate::traits::ApiError;
use thiserror::Error;

/// Result type alias for provider operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the provider
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input (bad identifier, missing required field, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Jitter interval rejected at construction
    #[error("Invalid interval: min {min} can't be bigger than max {max} and neither can be negative")]
    InvalidInterval {
        /// Lower bound as supplied
        min: String,
        /// Upper bound as supplied
        max: String,
    },

    /// Failure reported by the remote API, surfaced unmodified
    #[error(transparent)]
    Remote(#[from] ApiError),

    /// Operation aborted because its context was cancelled or expired
    #[error("context cancelled prior to condition being fulfilled: {0}")]
    Cancelled(CancelCause),

    /// A resource name could not be generated
    #[error("Name generation failed: {0}")]
    Generation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// No controller registered for a resource type
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// I/O errors (config files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a name generation error
    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an unknown resource type error
    pub fn unknown_resource(token: impl Into<String>) -> Self {
        Self::UnknownResource(token.into())
    }

    /// Whether this error belongs to the validation family
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InvalidInterval { .. })
    }

    /// The remote error, if this error came from the API client
    pub fn as_remote(&self) -> Option<&ApiError> {
        match self {
            Self::Remote(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_family() {
        assert!(Error::validation("id not an int").is_validation());
        assert!(
            Error::InvalidInterval {
                min: "2s".to_string(),
                max: "1s".to_string(),
            }
            .is_validation()
        );
        assert!(!Error::generation("no entropy").is_validation());
    }

    #[test]
    fn test_remote_error_is_transparent() {
        let err: Error = ApiError::with_status(500, "boom").into();
        assert_eq!(err.to_string(), "remote API error (status 500): boom");
        assert_eq!(err.as_remote().and_then(ApiError::status), Some(500));
    }
}
