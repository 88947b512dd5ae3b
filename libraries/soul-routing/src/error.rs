//! Error types for audio routing

use thiserror::Error;

/// Result type for routing operations
pub type Result<T> = std::result::Result<T, RoutingError>;

/// Routing errors
#[derive(Debug, Error)]
pub enum RoutingError {
    /// Preference store failure
    #[error("Preference store error: {0}")]
    Store(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RoutingError {
    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }
}

impl From<config::ConfigError> for RoutingError {
    fn from(err: config::ConfigError) -> Self {
        RoutingError::Config(err.to_string())
    }
}

/// Errors reported by the platform audio services
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlatformError {
    /// A live query against the audio service failed
    #[error("Platform query failed: {0}")]
    QueryFailed(String),

    /// The service is not reachable (not yet initialized, permission revoked)
    #[error("Platform service '{0}' is not available")]
    ServiceUnavailable(&'static str),
}

/// Failure of a single reconciliation tick
///
/// Never stops the monitoring schedule; the loop logs it and backs off once.
#[derive(Debug, Error)]
pub enum CheckError {
    /// Observing the live route failed
    #[error("Failed to observe routing: {0}")]
    Platform(#[from] PlatformError),

    /// A platform collaborator panicked during the check
    #[error("Routing check aborted: {0}")]
    Panicked(String),
}
