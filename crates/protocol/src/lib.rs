//! Shared protocol crate for the arena server.
//!
//! This crate contains:
//! - Packet definitions for both directions
//! - JSON text framing (`ClientPacket::parse`, `ServerPacket::encode`)
//! - Shape validation for inbound packets

mod error;
pub mod packets;

pub use error::ProtocolError;
pub use packets::{ClientPacket, ServerPacket};

use serde::{Deserialize, Serialize};

/// Role a connection declares when the socket opens (`?type=` query value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    Player,
    Spectator,
}

impl ConnectionKind {
    /// Read the connection kind from a raw query string such as `type=player&v=2`.
    ///
    /// Returns `None` when the `type` key is missing or names an unknown role.
    pub fn from_query(query: Option<&str>) -> Option<Self> {
        let query = query?;
        query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == "type")
            .and_then(|(_, value)| match value {
                "player" => Some(ConnectionKind::Player),
                "spectator" => Some(ConnectionKind::Spectator),
                _ => None,
            })
    }
}
