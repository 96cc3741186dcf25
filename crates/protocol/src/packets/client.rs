//! Client -> Server packet parsing.

use crate::ProtocolError;
use serde::{Deserialize, Serialize};

/// Largest viewport edge a client may report, in pixels.
pub const MAX_SCREEN_EDGE: f32 = 16384.0;

/// Parsed client packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientPacket {
    /// Handshake (`gotit`) with display name and optional identity token.
    /// Spectators send it without a payload.
    #[serde(rename = "gotit")]
    Handshake(Option<Handshake>),
    /// Heartbeat (`0`) carrying the movement target.
    #[serde(rename = "0")]
    Heartbeat(Target),
    /// Eject mass (`1`).
    #[serde(rename = "1")]
    Eject,
    /// Split (`2`).
    #[serde(rename = "2")]
    Split,
    /// Drop the current player and restart the handshake.
    #[serde(rename = "respawn")]
    Respawn,
    /// Viewport resize.
    #[serde(rename = "windowResized")]
    WindowResized(ScreenSize),
    /// Admin authentication.
    #[serde(rename = "pass")]
    AdminAuth { password: String },
    /// Admin kick by display name.
    #[serde(rename = "kick")]
    AdminKick {
        name: String,
        #[serde(default)]
        reason: String,
    },
    /// Chat line.
    #[serde(rename = "playerChat")]
    Chat { sender: String, message: String },
    /// Latency probe.
    #[serde(rename = "pingcheck")]
    PingCheck,
}

/// Handshake payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    #[serde(default)]
    pub name: String,
    /// Opaque external identity (wallet address); never interpreted.
    #[serde(default)]
    pub wallet_address: Option<String>,
    #[serde(default)]
    pub screen_width: Option<f32>,
    #[serde(default)]
    pub screen_height: Option<f32>,
}

/// Movement target, relative to the centre of the player's cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub x: f32,
    pub y: f32,
}

/// Viewport dimensions in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenSize {
    pub screen_width: f32,
    pub screen_height: f32,
}

impl ClientPacket {
    /// Parse a client packet from a text frame and check its shape.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let packet: ClientPacket = serde_json::from_str(text)?;
        packet.validate()?;
        Ok(packet)
    }

    /// Short name used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            ClientPacket::Handshake(_) => "gotit",
            ClientPacket::Heartbeat(_) => "heartbeat",
            ClientPacket::Eject => "eject",
            ClientPacket::Split => "split",
            ClientPacket::Respawn => "respawn",
            ClientPacket::WindowResized(_) => "windowResized",
            ClientPacket::AdminAuth { .. } => "pass",
            ClientPacket::AdminKick { .. } => "kick",
            ClientPacket::Chat { .. } => "playerChat",
            ClientPacket::PingCheck => "pingcheck",
        }
    }

    /// Basic shape checks. Anything beyond this is the game's business.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        let malformed = |reason| ProtocolError::Malformed {
            packet: self.name(),
            reason,
        };
        match self {
            ClientPacket::Heartbeat(target) => {
                if !target.x.is_finite() || !target.y.is_finite() {
                    return Err(malformed("target is not a finite point"));
                }
            }
            ClientPacket::WindowResized(size) => {
                if !valid_screen_edge(size.screen_width) || !valid_screen_edge(size.screen_height) {
                    return Err(malformed("screen size out of range"));
                }
            }
            ClientPacket::Handshake(Some(handshake)) => {
                let edges = [handshake.screen_width, handshake.screen_height];
                if edges.iter().flatten().any(|&edge| !valid_screen_edge(edge)) {
                    return Err(malformed("screen size out of range"));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[inline]
fn valid_screen_edge(edge: f32) -> bool {
    edge.is_finite() && edge > 0.0 && edge <= MAX_SCREEN_EDGE
}
