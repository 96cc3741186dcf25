//! Food pellet.

use super::{mass_to_radius, EntityId};
use glam::Vec2;

/// Static food, eaten on contact by any player cell.
#[derive(Debug, Clone)]
pub struct Food {
    pub id: EntityId,
    pub position: Vec2,
    pub mass: f32,
    pub radius: f32,
    pub hue: u16,
}

impl Food {
    pub fn new(id: EntityId, position: Vec2, mass: f32, hue: u16) -> Self {
        Self {
            id,
            position,
            mass,
            radius: mass_to_radius(mass),
            hue,
        }
    }
}
