//! Error types for the repertoire diversity engine
//!
//! This module provides structured error definitions using thiserror, with
//! anyhow reserved for propagation at the binary edge. Infrastructure errors
//! (database, HTTP) are kept distinct from domain errors so callers can tell
//! a failing store apart from a failing generation request.

use thiserror::Error;

/// Main error type for repertoire operations
#[derive(Error, Debug)]
pub enum RepertoireError {
    /// Request validation failed (missing or malformed fields)
    #[error("Validation error: {0}")]
    Validation(String),

    /// External recipe generator failed or returned an unusable draft
    #[error("Generation error: {0}")]
    Generation(String),

    /// Embedding generation or validation failed
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector dimensionality mismatch during similarity computation
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Recipe not found
    #[error("Recipe not found: {0}")]
    RecipeNotFound(String),

    /// Configuration error (e.g. diversity weights not summing to 1.0)
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Upstream API rate limit hit
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for repertoire operations
pub type Result<T> = std::result::Result<T, RepertoireError>;

impl From<anyhow::Error> for RepertoireError {
    fn from(err: anyhow::Error) -> Self {
        RepertoireError::Other(err.to_string())
    }
}

impl RepertoireError {
    /// Build a configuration error from a plain message
    pub fn config(msg: impl Into<String>) -> Self {
        RepertoireError::Config(config::ConfigError::Message(msg.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RepertoireError::RecipeNotFound("test-id".to_string());
        assert_eq!(err.to_string(), "Recipe not found: test-id");
    }

    #[test]
    fn test_dimension_mismatch_display() {
        let err = RepertoireError::DimensionMismatch {
            expected: 1536,
            actual: 512,
        };
        assert_eq!(
            err.to_string(),
            "Dimension mismatch: expected 1536, got 512"
        );
    }

    #[test]
    fn test_config_helper() {
        let err = RepertoireError::config("weights must sum to 1.0");
        assert!(matches!(err, RepertoireError::Config(_)));
    }
}
