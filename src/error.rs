//! Error types for the Theia annotation engine
//!
//! This module provides structured error definitions using thiserror.
//! Pipeline entry points degrade gracefully instead of erroring (malformed
//! text and corrupted persisted state are recoverable by design); the
//! variants here cover the storage boundary and configuration validation.

use thiserror::Error;

/// Main error type for Theia operations
#[derive(Error, Debug)]
pub enum TheiaError {
    /// Key-value store operation failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for Theia operations
pub type Result<T> = std::result::Result<T, TheiaError>;

/// Convert anyhow::Error to TheiaError
impl From<anyhow::Error> for TheiaError {
    fn from(err: anyhow::Error) -> Self {
        TheiaError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TheiaError::Storage("backend unavailable".to_string());
        assert_eq!(err.to_string(), "Storage error: backend unavailable");
    }

    #[test]
    fn test_serde_error_conversion() {
        let parse_err = serde_json::from_str::<u32>("not a number").unwrap_err();
        let err: TheiaError = parse_err.into();
        assert!(matches!(err, TheiaError::Serialization(_)));
    }
}
