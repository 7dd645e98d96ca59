//! Error types for the function host
//!
//! Provides a unified error type shared by the host subsystems

use thiserror::Error;

/// Result type alias using HostError
pub type Result<T> = std::result::Result<T, HostError>;

/// Unified error type for host operations
#[derive(Debug, Error)]
pub enum HostError {
    // Configuration errors (fatal at construction)
    #[error("Configuration error: {0}")]
    Config(String),

    // Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Self-telemetry registration errors
    #[error("Telemetry error: {0}")]
    Telemetry(String),

    // Async runtime errors
    #[error("Runtime error: {0}")]
    Runtime(String),

    // Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl HostError {
    /// Whether this error must stop the component from initializing
    pub fn is_fatal(&self) -> bool {
        matches!(self, HostError::Config(_) | HostError::Runtime(_))
    }
}

impl From<serde_json::Error> for HostError {
    fn from(err: serde_json::Error) -> Self {
        HostError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for HostError {
    fn from(err: std::io::Error) -> Self {
        HostError::Storage(err.to_string())
    }
}

impl From<anyhow::Error> for HostError {
    fn from(err: anyhow::Error) -> Self {
        HostError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HostError::Config("FUNCTIONS_METRICS_PUBLISH_PATH not configured".to_string());
        assert!(err.to_string().contains("FUNCTIONS_METRICS_PUBLISH_PATH"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_io_error_maps_to_storage() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: HostError = io.into();
        assert!(matches!(err, HostError::Storage(_)));
        assert!(!err.is_fatal());
    }
}
