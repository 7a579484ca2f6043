//! Unified error handling for the timelock client
//!
//! Gateway and decoding failures are absorbed at the lifecycle engine
//! boundary and surfaced as notifications; they never propagate out of it.

use thiserror::Error;

/// Result type alias for timelock-client operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Network unreachable or the server answered non-2xx
    #[error("transport error: {0}")]
    Transport(String),

    /// A 2xx response body is missing expected fields
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A payload could not be decoded for display or download
    #[error("decode error: {0}")]
    Decode(String),

    /// The message id is not in the live set
    #[error("message not found: {0}")]
    NotFound(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem error while saving an attachment
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Check if this error came from the network boundary
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
