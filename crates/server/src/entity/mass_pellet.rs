//! Ejected mass.

use super::{mass_to_radius, Cell, EntityId, PlayerId};
use super::cell::SPEED_DECREMENT;
use crate::world::Border;
use glam::Vec2;

/// A pellet fired out of a player cell.
#[derive(Debug, Clone)]
pub struct MassPellet {
    pub id: EntityId,
    pub position: Vec2,
    /// Unit flight direction.
    pub direction: Vec2,
    pub speed: f32,
    pub mass: f32,
    pub radius: f32,
    pub hue: u16,
    pub owner: PlayerId,
    /// Split sequence of the emitting cell at emission time.
    pub owner_seq: u32,
    /// Index of the emitting cell in the owner's cell list at emission time.
    pub emitter: usize,
}

impl MassPellet {
    /// Fire a pellet from `cell` (at index `emitter`) towards `aim`.
    ///
    /// The pellet starts just past the cell's edge so the cell's own
    /// containment circle does not cover it, then pulled inside the border.
    #[allow(clippy::too_many_arguments)]
    pub fn emit(
        id: EntityId,
        cell: &Cell,
        emitter: usize,
        aim: Vec2,
        mass: f32,
        speed: f32,
        hue: u16,
        border: &Border,
    ) -> Self {
        let direction = (aim - cell.position).try_normalize().unwrap_or(Vec2::X);
        let radius = mass_to_radius(mass);
        Self {
            id,
            position: border.clamp(cell.position + direction * (cell.radius() + radius), radius),
            direction,
            speed,
            mass,
            radius,
            hue,
            owner: cell.owner,
            owner_seq: cell.split_seq,
            emitter,
        }
    }

    #[inline]
    pub fn is_moving(&self) -> bool {
        self.speed > 0.0
    }

    /// Whether `cell` emitted this pellet and may not eat it yet.
    #[inline]
    pub fn is_guarded_from(&self, cell: &Cell) -> bool {
        self.is_moving() && self.owner == cell.owner && self.owner_seq == cell.split_seq
    }

    /// Advance one physics tick.
    pub fn step(&mut self, border: &Border) {
        if !self.is_moving() {
            return;
        }
        self.position += self.direction * self.speed;
        self.speed = (self.speed - SPEED_DECREMENT).max(0.0);
        self.position = border.clamp(self.position, self.radius);
    }
}
