//! Error types for the live telemetry feed.

use thiserror::Error;

/// Main error type for feed operations.
///
/// Cloneable so a single pending connect can hand the same outcome to every
/// waiter.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FeedError {
    #[error("Transport capability unavailable: {0}")]
    CapabilityUnavailable(String),

    #[error("Connect failed: {0}")]
    ConnectFailure(String),

    #[error("Connection released before connect completed")]
    ConnectionReleased,

    #[error("Subscribe to {topic} failed: {reason}")]
    Subscribe { topic: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl FeedError {
    /// Whether a fresh acquisition could succeed without the host changing.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            FeedError::CapabilityUnavailable(_) | FeedError::InvalidConfig(_)
        )
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(e: serde_json::Error) -> Self {
        FeedError::InvalidConfig(e.to_string())
    }
}

/// Result type for feed operations.
pub type Result<T> = std::result::Result<T, FeedError>;
