//! Error types for visitors.

use thiserror::Error;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors surfaced to the visitor.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Microphone access was refused. The visitor stays silent.
    #[error("microphone permission denied")]
    PermissionDenied,

    /// The relay has not assigned an identity yet.
    #[error("no identity assigned by the relay yet")]
    NotAssigned,

    /// WebSocket failure talking to the relay
    #[error("transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    /// A frame could not be encoded or decoded
    #[error("protocol error: {0}")]
    Protocol(#[from] grove_protocol::Error),
}
