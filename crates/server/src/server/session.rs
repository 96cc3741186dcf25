//! Per-connection session state.

use crate::entity::PlayerId;
use glam::Vec2;
use protocol::{ConnectionKind, ServerPacket};
use tokio::sync::mpsc::UnboundedSender;

/// Connection ids double as player ids.
pub type ConnectionId = PlayerId;

/// Viewport assumed until the client reports its own.
pub const DEFAULT_SCREEN: Vec2 = Vec2::new(1920.0, 1080.0);

/// Lifecycle of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// Socket accepted, not yet greeted.
    Connecting,
    /// `welcome` sent, waiting for `gotit`.
    Handshaking,
    /// Registered (a live player, or a joined spectator).
    Active,
    /// Last cell eaten; only `respawn` brings it back.
    Dying,
    Disconnected,
    Kicked,
}

/// A connected client session.
#[derive(Debug)]
pub struct Session {
    pub id: ConnectionId,
    pub kind: ConnectionKind,
    pub phase: ConnectionPhase,
    /// Hue kept across respawns.
    pub hue: u16,
    pub screen: Vec2,
    pub admin: bool,
    /// Display name of the current (or last) player.
    pub name: String,
    outbound: UnboundedSender<ServerPacket>,
}

impl Session {
    pub fn new(id: ConnectionId, kind: ConnectionKind, hue: u16, outbound: UnboundedSender<ServerPacket>) -> Self {
        Self {
            id,
            kind,
            phase: ConnectionPhase::Connecting,
            hue,
            screen: DEFAULT_SCREEN,
            admin: false,
            name: String::new(),
            outbound,
        }
    }

    /// Queue a packet. Returns `false` if the connection task is gone.
    #[inline]
    pub fn send(&self, packet: ServerPacket) -> bool {
        self.outbound.send(packet).is_ok()
    }

    #[inline]
    pub fn is_spectator(&self) -> bool {
        self.kind == ConnectionKind::Spectator
    }

    /// Whether this connection should receive world snapshots.
    pub fn wants_snapshots(&self) -> bool {
        match self.kind {
            ConnectionKind::Spectator => matches!(
                self.phase,
                ConnectionPhase::Handshaking | ConnectionPhase::Active
            ),
            ConnectionKind::Player => self.phase == ConnectionPhase::Active,
        }
    }
}
