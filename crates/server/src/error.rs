//! Game error types.

use crate::entity::PlayerId;
use protocol::ProtocolError;
use std::time::Duration;
use thiserror::Error;

/// Rejections raised while applying a connection's input to the game.
///
/// None of these are fatal to the scheduler; the worst outcome is that the
/// offending connection gets kicked.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("Invalid nickname: {0:?}")]
    InvalidNickname(String),

    #[error("Connection {0} already has a live player")]
    DuplicateIdentity(PlayerId),

    #[error(transparent)]
    Malformed(#[from] ProtocolError),

    #[error("Last heartbeat received over {}ms ago.", .0.as_millis())]
    HeartbeatTimeout(Duration),

    #[error("Unknown connection {0}")]
    UnknownConnection(PlayerId),

    #[error("{0} is not allowed right now")]
    NotPermitted(&'static str),
}

impl GameError {
    /// Whether the connection must be kicked for this error.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, GameError::UnknownConnection(_) | GameError::NotPermitted(_))
    }

    /// Reason text sent with the `kick` packet.
    pub fn kick_reason(&self) -> String {
        match self {
            GameError::InvalidNickname(_) => "Invalid username.".to_string(),
            GameError::DuplicateIdentity(_) => "Duplicate handshake.".to_string(),
            GameError::Malformed(_) => "Malformed message.".to_string(),
            other => other.to_string(),
        }
    }
}
