//! World state management.
//!
//! Owns every live entity. All mutation happens on the game task, so there is
//! no locking here; the resolver and balancer borrow the store for the length
//! of one tick.

use crate::entity::{EntityId, Food, MassPellet, Player, PlayerId, Virus};
use fixedbitset::FixedBitSet;
use glam::Vec2;
use rand::Rng;
use std::collections::HashMap;

/// World border, spanning `0..width` by `0..height`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Border {
    pub width: f32,
    pub height: f32,
}

impl Border {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// Get a random position at least `margin` away from every edge.
    pub fn random_position(&self, margin: f32) -> Vec2 {
        let mut rng = rand::rng();
        let margin_x = margin.clamp(0.0, self.width / 2.0);
        let margin_y = margin.clamp(0.0, self.height / 2.0);
        let x = if self.width - margin_x > margin_x {
            rng.random_range(margin_x..self.width - margin_x)
        } else {
            self.width / 2.0
        };
        let y = if self.height - margin_y > margin_y {
            rng.random_range(margin_y..self.height - margin_y)
        } else {
            self.height / 2.0
        };
        Vec2::new(x, y)
    }

    /// Pull `point` inside the border, keeping `margin` from each edge.
    #[inline]
    pub fn clamp(&self, point: Vec2, margin: f32) -> Vec2 {
        let margin_x = margin.clamp(0.0, self.width / 2.0);
        let margin_y = margin.clamp(0.0, self.height / 2.0);
        Vec2::new(
            point.x.clamp(margin_x, self.width - margin_x),
            point.y.clamp(margin_y, self.height - margin_y),
        )
    }

    #[inline]
    pub fn contains(&self, point: Vec2) -> bool {
        (0.0..=self.width).contains(&point.x) && (0.0..=self.height).contains(&point.y)
    }
}

/// The game world containing all entities.
#[derive(Debug)]
pub struct World {
    /// Next entity ID to assign.
    next_entity_id: EntityId,
    pub border: Border,

    /// Live players, in join order until a removal swaps the last one in.
    players: Vec<Player>,
    /// Position tracking for O(1) lookup and removal.
    player_pos: HashMap<PlayerId, usize>,

    pub food: Vec<Food>,
    pub pellets: Vec<MassPellet>,
    pub viruses: Vec<Virus>,
}

impl World {
    /// Create a new world with the given border size.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            next_entity_id: 1,
            border: Border::new(width, height),
            players: Vec::with_capacity(64),
            player_pos: HashMap::with_capacity(64),
            food: Vec::with_capacity(1024),
            pellets: Vec::with_capacity(256),
            viruses: Vec::with_capacity(64),
        }
    }

    /// Get the next entity ID.
    pub fn next_id(&mut self) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id = self.next_entity_id.wrapping_add(1);
        if self.next_entity_id == 0 {
            self.next_entity_id = 1; // Skip 0
        }
        id
    }

    #[inline]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    #[inline]
    pub fn players_mut(&mut self) -> &mut [Player] {
        &mut self.players
    }

    #[inline]
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.player_pos.get(&id).map(|&pos| &self.players[pos])
    }

    #[inline]
    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.player_pos.get(&id).map(|&pos| &mut self.players[pos])
    }

    #[inline]
    pub fn contains_player(&self, id: PlayerId) -> bool {
        self.player_pos.contains_key(&id)
    }

    /// Add a player. Returns `false` (and drops the player) if the id is taken.
    pub fn insert_player(&mut self, player: Player) -> bool {
        if self.player_pos.contains_key(&player.id) || player.cells.is_empty() {
            return false;
        }
        self.player_pos.insert(player.id, self.players.len());
        self.players.push(player);
        true
    }

    /// Remove a player (O(1)).
    pub fn remove_player(&mut self, id: PlayerId) -> Option<Player> {
        let pos = self.player_pos.remove(&id)?;
        let player = self.players.swap_remove(pos);
        if let Some(moved) = self.players.get(pos) {
            self.player_pos.insert(moved.id, pos);
        }
        Some(player)
    }

    /// Remove every player left without cells, returning them.
    pub fn remove_empty_players(&mut self) -> Vec<Player> {
        let empty: Vec<PlayerId> = self
            .players
            .iter()
            .filter(|p| p.cells.is_empty())
            .map(|p| p.id)
            .collect();
        empty.into_iter().filter_map(|id| self.remove_player(id)).collect()
    }

    /// Positions and radii of every live player cell.
    pub fn occupied(&self) -> Vec<(Vec2, f32)> {
        self.players
            .iter()
            .flat_map(|p| p.cells.iter().map(|c| (c.position, c.radius())))
            .collect()
    }

    pub fn add_food(&mut self, position: Vec2, mass: f32, hue: u16) -> EntityId {
        let id = self.next_id();
        self.food.push(Food::new(id, position, mass, hue));
        id
    }

    pub fn add_virus(&mut self, position: Vec2, mass: f32) -> EntityId {
        let id = self.next_id();
        self.viruses.push(Virus::new(id, position, mass));
        id
    }

    pub fn add_pellet(&mut self, pellet: MassPellet) {
        self.pellets.push(pellet);
    }

    /// Drop every food whose index is set in `eaten`.
    pub fn remove_food(&mut self, eaten: &FixedBitSet) {
        retain_unmarked(&mut self.food, eaten);
    }

    pub fn remove_pellets(&mut self, eaten: &FixedBitSet) {
        retain_unmarked(&mut self.pellets, eaten);
    }

    pub fn remove_viruses(&mut self, eaten: &FixedBitSet) {
        retain_unmarked(&mut self.viruses, eaten);
    }

    /// Mass held by players, food and pellets (viruses excluded).
    pub fn total_mass(&self) -> f32 {
        let players: f32 = self.players.iter().map(Player::mass_total).sum();
        let food: f32 = self.food.iter().map(|f| f.mass).sum();
        let pellets: f32 = self.pellets.iter().map(|p| p.mass).sum();
        players + food + pellets
    }

    /// Get the count of each entity type.
    #[inline]
    pub fn counts(&self) -> EntityCounts {
        EntityCounts {
            players: self.players.len(),
            cells: self.players.iter().map(|p| p.cells.len()).sum(),
            food: self.food.len(),
            pellets: self.pellets.len(),
            viruses: self.viruses.len(),
        }
    }

    /// Generate a random hue.
    #[inline]
    pub fn random_hue() -> u16 {
        rand::rng().random_range(0..360)
    }
}

fn retain_unmarked<T>(items: &mut Vec<T>, marked: &FixedBitSet) {
    let mut index = 0;
    items.retain(|_| {
        let keep = !marked.contains(index);
        index += 1;
        keep
    });
}

/// Entity count statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityCounts {
    pub players: usize,
    pub cells: usize,
    pub food: usize,
    pub pellets: usize,
    pub viruses: usize,
}
