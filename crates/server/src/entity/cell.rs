//! Player cell and the mass/radius law.

use super::PlayerId;
use crate::config::PlayerConfig;
use crate::world::Border;
use glam::Vec2;

/// Aim points closer than this (plus the cell radius) slow the cell down.
const MIN_DISTANCE: f32 = 50.0;
/// Launch speed lost per physics tick.
pub const SPEED_DECREMENT: f32 = 0.5;

/// Radius of a circle holding `mass`.
///
/// Continuous and strictly increasing; every geometry test goes through it.
#[inline]
pub fn mass_to_radius(mass: f32) -> f32 {
    debug_assert!(mass >= 0.0, "negative mass {mass}");
    4.0 + mass.max(0.0).sqrt() * 6.0
}

/// One circular unit owned by a player.
#[derive(Debug, Clone)]
pub struct Cell {
    pub owner: PlayerId,
    pub position: Vec2,
    mass: f32,
    radius: f32,
    /// Current speed. Starts at the split launch speed and decays to the base.
    pub speed: f32,
    /// Bumped on every split; guards against eating freshly ejected pellets.
    pub split_seq: u32,
}

impl Cell {
    pub fn new(owner: PlayerId, position: Vec2, mass: f32, speed: f32, split_seq: u32) -> Self {
        Self {
            owner,
            position,
            mass,
            radius: mass_to_radius(mass),
            speed,
            split_seq,
        }
    }

    #[inline]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Set the mass and recompute the radius.
    #[inline]
    pub fn set_mass(&mut self, mass: f32) {
        self.mass = mass;
        self.radius = mass_to_radius(mass);
    }

    #[inline]
    pub fn add_mass(&mut self, delta: f32) {
        self.set_mass(self.mass + delta);
    }

    /// Whether `point` lies inside (or on) this cell's circle.
    #[inline]
    pub fn contains_point(&self, point: Vec2) -> bool {
        self.position.distance_squared(point) <= self.radius * self.radius
    }

    /// Advance one physics tick towards `aim` (absolute world coordinates).
    pub fn step(&mut self, aim: Vec2, config: &PlayerConfig, border: &Border) {
        let base_speed = config.speed as f32;
        let offset = aim - self.position;
        let distance = offset.length();

        if distance > f32::EPSILON {
            let slow_down = if self.speed <= base_speed {
                slow_down(self.mass, config.default_mass as f32, config.slow_base as f32)
            } else {
                1.0
            };
            let mut delta = offset / distance * (self.speed / slow_down);
            let reach = MIN_DISTANCE + self.radius;
            if distance < reach {
                delta *= distance / reach;
            }
            self.position += delta;
        }

        if self.speed > base_speed {
            self.speed = (self.speed - SPEED_DECREMENT).max(base_speed);
        }
        self.position = border.clamp(self.position, self.radius / 3.0);
    }
}

/// Logarithmic speed penalty for heavy cells; 1.0 at the default mass.
#[inline]
fn slow_down(mass: f32, default_mass: f32, base: f32) -> f32 {
    let log = |value: f32| value.max(1.0).ln() / base.ln();
    (log(mass) - log(default_mass) + 1.0).max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radius_is_monotonic() {
        let mut previous = mass_to_radius(0.0);
        for step in 1..2000 {
            let radius = mass_to_radius(step as f32 * 0.5);
            assert!(radius > previous);
            previous = radius;
        }
    }

    #[test]
    fn test_radius_follows_mass() {
        let mut cell = Cell::new(1, Vec2::ZERO, 100.0, 6.25, 0);
        assert_eq!(cell.radius(), 64.0);
        cell.add_mass(44.0);
        assert_eq!(cell.mass(), 144.0);
        assert_eq!(cell.radius(), 76.0);
    }

    #[test]
    fn test_step_moves_towards_aim_and_stays_in_border() {
        let config = PlayerConfig::default();
        let border = Border::new(1000.0, 1000.0);
        let mut cell = Cell::new(1, Vec2::new(500.0, 500.0), 10.0, 6.25, 0);
        cell.step(Vec2::new(900.0, 500.0), &config, &border);
        assert!(cell.position.x > 500.0);
        assert_eq!(cell.position.y, 500.0);

        let mut edge = Cell::new(1, Vec2::new(995.0, 500.0), 10.0, 20.0, 0);
        edge.step(Vec2::new(5000.0, 500.0), &config, &border);
        assert!(edge.position.x <= 1000.0 - edge.radius() / 3.0);
        assert_eq!(edge.speed, 19.5);
    }
}
