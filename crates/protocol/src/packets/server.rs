//! Server -> Client packet building.

use crate::ProtocolError;
use serde::{Deserialize, Serialize};

/// Outbound packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerPacket {
    /// Handshake acknowledgment.
    #[serde(rename = "welcome")]
    Welcome {
        player: PlayerSettings,
        world: WorldSize,
    },
    /// Periodic per-player view of the world.
    #[serde(rename = "serverTellPlayerMove")]
    Snapshot(Snapshot),
    /// Ranked top players; only sent when the ranking changed.
    #[serde(rename = "leaderboard")]
    Leaderboard(LeaderboardUpdate),
    #[serde(rename = "playerJoin")]
    PlayerJoin { name: String },
    #[serde(rename = "playerDisconnect")]
    PlayerDisconnect { name: String },
    #[serde(rename = "playerDied")]
    PlayerDied { name: String },
    /// The receiving player's last cell was eaten.
    #[serde(rename = "RIP")]
    Rip,
    /// The receiving connection is being evicted.
    #[serde(rename = "kick")]
    Kick { reason: String },
    #[serde(rename = "pongcheck")]
    PongCheck,
    /// Server notice shown in the chat box.
    #[serde(rename = "serverMSG")]
    ServerMessage { message: String },
    #[serde(rename = "serverSendPlayerChat")]
    Chat { sender: String, message: String },
}

impl ServerPacket {
    /// Encode as a JSON text frame.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Player settings sent with `welcome`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSettings {
    pub id: u32,
    pub name: String,
    pub hue: u16,
    pub admin: bool,
}

/// World dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldSize {
    pub width: f32,
    pub height: f32,
}

/// One player's visible slice of the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// The receiving player (a zero-mass placeholder for spectators).
    pub player: PlayerState,
    pub players: Vec<PlayerState>,
    pub food: Vec<FoodState>,
    pub mass: Vec<PelletState>,
    pub viruses: Vec<VirusState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub id: u32,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub mass_total: f32,
    pub hue: u16,
    pub cells: Vec<CellState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellState {
    pub x: f32,
    pub y: f32,
    pub mass: f32,
    pub radius: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FoodState {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub hue: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PelletState {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub hue: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VirusState {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub mass: f32,
    pub radius: f32,
}

/// Leaderboard payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardUpdate {
    /// Number of live players in the world.
    pub players: usize,
    pub leaderboard: Vec<LeaderboardEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub id: u32,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_uses_wire_names() {
        let text = ServerPacket::Rip.encode().unwrap();
        assert_eq!(text, r#"{"type":"RIP"}"#);

        let text = ServerPacket::Kick { reason: "Invalid username.".into() }
            .encode()
            .unwrap();
        assert_eq!(text, r#"{"type":"kick","data":{"reason":"Invalid username."}}"#);
    }

    #[test]
    fn test_snapshot_field_names() {
        let packet = ServerPacket::Snapshot(Snapshot {
            player: PlayerState {
                id: 7,
                name: "blob".into(),
                x: 1.0,
                y: 2.0,
                mass_total: 10.0,
                hue: 120,
                cells: vec![],
            },
            players: vec![],
            food: vec![],
            mass: vec![],
            viruses: vec![],
        });
        let text = packet.encode().unwrap();
        assert!(text.starts_with(r#"{"type":"serverTellPlayerMove""#));
        assert!(text.contains(r#""massTotal":10.0"#));
    }
}
