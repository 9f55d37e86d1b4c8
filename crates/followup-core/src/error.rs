//! Error types for FollowUp.

use thiserror::Error;

/// Unified error type across all FollowUp crates.
#[derive(Debug, Error)]
pub enum FollowUpError {
    /// Prospect or sequence is absent, or not owned by the caller.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Outbound channel call failed; safe to retry on the next run.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Composer error: {0}")]
    Composer(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Invalid input: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl FollowUpError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Result type alias for FollowUp operations.
pub type Result<T> = std::result::Result<T, FollowUpError>;
