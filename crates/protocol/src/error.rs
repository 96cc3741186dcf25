//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while decoding or encoding messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Undecodable message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed {packet} message: {reason}")]
    Malformed {
        packet: &'static str,
        reason: &'static str,
    },
}
