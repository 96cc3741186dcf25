//! Virus.

use super::{mass_to_radius, EntityId};
use glam::Vec2;

/// Static hazard. A cell that swallows one is split apart.
#[derive(Debug, Clone)]
pub struct Virus {
    pub id: EntityId,
    pub position: Vec2,
    pub mass: f32,
    pub radius: f32,
}

impl Virus {
    pub fn new(id: EntityId, position: Vec2, mass: f32) -> Self {
        Self {
            id,
            position,
            mass,
            radius: mass_to_radius(mass),
        }
    }
}
