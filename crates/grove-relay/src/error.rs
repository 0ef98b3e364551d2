//! Error types for the relay.

use thiserror::Error;

/// Result type for relay operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the relay.
#[derive(Debug, Error)]
pub enum Error {
    /// Listener or socket failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Frame could not be decoded
    #[error("Protocol error: {0}")]
    Protocol(#[from] grove_protocol::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The hub task has stopped and no longer accepts commands
    #[error("relay hub is closed")]
    HubClosed,
}
