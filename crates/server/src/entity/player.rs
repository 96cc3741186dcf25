//! Player record.

use super::Cell;
use glam::Vec2;
use std::time::Instant;

/// Players are keyed by the id of the connection that owns them.
pub type PlayerId = u32;

/// A live player and its cells.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub hue: u16,
    /// Owned cells. Never empty while the player is in the world.
    pub cells: Vec<Cell>,
    /// Movement target, relative to `center()`.
    pub target: Vec2,
    pub admin: bool,
    pub last_heartbeat: Instant,
    /// Viewport size in screen pixels.
    pub screen: Vec2,
    /// Opaque external identity (wallet address) carried from the handshake.
    pub identity: Option<String>,
    /// Physics tick of the most recent split, if any.
    pub last_split_tick: Option<u64>,
    next_split_seq: u32,
}

impl Player {
    pub fn new(id: PlayerId, name: String, hue: u16, first: Cell, screen: Vec2, now: Instant) -> Self {
        Self {
            id,
            name,
            hue,
            cells: vec![first],
            target: Vec2::ZERO,
            admin: false,
            last_heartbeat: now,
            screen,
            identity: None,
            last_split_tick: None,
            next_split_seq: 1,
        }
    }

    /// Aggregate mass over all cells.
    pub fn mass_total(&self) -> f32 {
        self.cells.iter().map(Cell::mass).sum()
    }

    /// Sum of cell radii, used to size the viewport.
    pub fn radius_total(&self) -> f32 {
        self.cells.iter().map(Cell::radius).sum()
    }

    /// Mean position of the player's cells.
    pub fn center(&self) -> Vec2 {
        if self.cells.is_empty() {
            return Vec2::ZERO;
        }
        let sum: Vec2 = self.cells.iter().map(|c| c.position).sum();
        sum / self.cells.len() as f32
    }

    /// Absolute world point the cells steer towards.
    #[inline]
    pub fn aim(&self) -> Vec2 {
        self.center() + self.target
    }

    /// Hand out a fresh split sequence number.
    pub fn next_split_seq(&mut self) -> u32 {
        let seq = self.next_split_seq;
        self.next_split_seq = self.next_split_seq.wrapping_add(1);
        seq
    }

    /// Whether own cells may merge at `tick`.
    pub fn can_merge(&self, tick: u64, merge_ticks: u64) -> bool {
        self.last_split_tick
            .is_none_or(|split| tick.saturating_sub(split) >= merge_ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_and_totals() {
        let now = Instant::now();
        let mut player = Player::new(
            7,
            "blob".into(),
            0,
            Cell::new(7, Vec2::new(0.0, 0.0), 100.0, 6.25, 0),
            Vec2::new(1920.0, 1080.0),
            now,
        );
        player.cells.push(Cell::new(7, Vec2::new(100.0, 50.0), 44.0, 6.25, 1));
        assert_eq!(player.mass_total(), 144.0);
        assert_eq!(player.center(), Vec2::new(50.0, 25.0));
        player.target = Vec2::new(10.0, 0.0);
        assert_eq!(player.aim(), Vec2::new(60.0, 25.0));
    }

    #[test]
    fn test_merge_window() {
        let mut player = Player::new(
            1,
            "a".into(),
            0,
            Cell::new(1, Vec2::ZERO, 10.0, 6.25, 0),
            Vec2::ONE,
            Instant::now(),
        );
        assert!(player.can_merge(0, 100));
        player.last_split_tick = Some(50);
        assert!(!player.can_merge(149, 100));
        assert!(player.can_merge(150, 100));
    }
}
