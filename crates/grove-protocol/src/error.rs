//! Error types for grove-protocol.

use thiserror::Error;

/// Result type for encoding and decoding wire events.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while handling wire events.
#[derive(Debug, Error)]
pub enum Error {
    /// The frame was not a recognizable event.
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}
