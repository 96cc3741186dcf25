//! Per-player visibility culling.
//!
//! The viewport is centred on the player and scaled by the summed radius of
//! its cells: `scale = min(64 / radius_total, 1) ^ 0.4`, and the half extents
//! are `screen / 2 / scale`, so heavier players see further.

use crate::entity::{Cell, Food, MassPellet, Player, Virus};
use crate::world::World;
use glam::Vec2;
use protocol::packets::{CellState, FoodState, PelletState, PlayerState, Snapshot, VirusState};

/// Axis-aligned view rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: Vec2,
    pub half_extents: Vec2,
}

impl Viewport {
    pub fn for_player(player: &Player) -> Self {
        let scale = (64.0 / player.radius_total().max(1.0)).min(1.0).powf(0.4);
        Self {
            center: player.center(),
            half_extents: player.screen / 2.0 / scale,
        }
    }

    /// Whether the circle touches the rectangle.
    #[inline]
    pub fn intersects_circle(&self, position: Vec2, radius: f32) -> bool {
        let closest = position.clamp(self.center - self.half_extents, self.center + self.half_extents);
        closest.distance_squared(position) <= radius * radius
    }
}

/// One other player as seen through a viewport.
#[derive(Debug)]
pub struct VisiblePlayer<'a> {
    pub player: &'a Player,
    pub cells: Vec<&'a Cell>,
}

/// Everything one viewer gets to see this broadcast tick.
#[derive(Debug, Default)]
pub struct Visible<'a> {
    pub players: Vec<VisiblePlayer<'a>>,
    pub food: Vec<&'a Food>,
    pub pellets: Vec<&'a MassPellet>,
    pub viruses: Vec<&'a Virus>,
}

/// Cull the world down to what `viewer` can see. The viewer's own cells are
/// carried separately and always sent.
pub fn cull<'a>(world: &'a World, viewer: &Player) -> Visible<'a> {
    let view = Viewport::for_player(viewer);
    let players = world
        .players()
        .iter()
        .filter(|p| p.id != viewer.id)
        .filter_map(|player| {
            let cells: Vec<&Cell> = player
                .cells
                .iter()
                .filter(|c| view.intersects_circle(c.position, c.radius()))
                .collect();
            (!cells.is_empty()).then_some(VisiblePlayer { player, cells })
        })
        .collect();

    Visible {
        players,
        food: world
            .food
            .iter()
            .filter(|f| view.intersects_circle(f.position, f.radius))
            .collect(),
        pellets: world
            .pellets
            .iter()
            .filter(|p| view.intersects_circle(p.position, p.radius))
            .collect(),
        viruses: world
            .viruses
            .iter()
            .filter(|v| view.intersects_circle(v.position, v.radius))
            .collect(),
    }
}

/// The unfiltered world, for spectators.
pub fn everything(world: &World) -> Visible<'_> {
    Visible {
        players: world
            .players()
            .iter()
            .map(|player| VisiblePlayer {
                player,
                cells: player.cells.iter().collect(),
            })
            .collect(),
        food: world.food.iter().collect(),
        pellets: world.pellets.iter().collect(),
        viruses: world.viruses.iter().collect(),
    }
}

/// Wire form of a player and the given subset of its cells.
pub fn player_state<'a>(player: &Player, cells: impl IntoIterator<Item = &'a Cell>) -> PlayerState {
    let center = player.center();
    PlayerState {
        id: player.id,
        name: player.name.clone(),
        x: center.x,
        y: center.y,
        mass_total: player.mass_total(),
        hue: player.hue,
        cells: cells
            .into_iter()
            .map(|c| CellState {
                x: c.position.x,
                y: c.position.y,
                mass: c.mass(),
                radius: c.radius(),
            })
            .collect(),
    }
}

/// Zero-mass stand-in sent to spectators as their own player.
pub fn spectator_state(world: &World) -> PlayerState {
    let center = world.border.center();
    PlayerState {
        id: 0,
        name: String::new(),
        x: center.x,
        y: center.y,
        mass_total: 0.0,
        hue: 0,
        cells: Vec::new(),
    }
}

impl Visible<'_> {
    pub fn into_snapshot(self, own: PlayerState) -> Snapshot {
        Snapshot {
            player: own,
            players: self
                .players
                .into_iter()
                .map(|v| player_state(v.player, v.cells))
                .collect(),
            food: self
                .food
                .into_iter()
                .map(|f| FoodState {
                    id: f.id,
                    x: f.position.x,
                    y: f.position.y,
                    radius: f.radius,
                    hue: f.hue,
                })
                .collect(),
            mass: self
                .pellets
                .into_iter()
                .map(|p| PelletState {
                    id: p.id,
                    x: p.position.x,
                    y: p.position.y,
                    radius: p.radius,
                    hue: p.hue,
                })
                .collect(),
            viruses: self
                .viruses
                .into_iter()
                .map(|v| VirusState {
                    id: v.id,
                    x: v.position.x,
                    y: v.position.y,
                    mass: v.mass,
                    radius: v.radius,
                })
                .collect(),
        }
    }
}
