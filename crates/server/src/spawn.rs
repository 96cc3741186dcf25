//! Spawn point selection.

use crate::config::SpawnStrategy;
use crate::world::Border;
use glam::Vec2;

/// Random candidates tried by [`FarthestSpawn`].
pub const SPAWN_CANDIDATES: usize = 10;

/// Picks where a new circle of `radius` enters the world.
pub trait SpawnPolicy: Send + Sync {
    fn name(&self) -> &str;

    /// Always returns an in-bounds point. `occupied` lists live player cells
    /// as `(position, radius)`.
    fn pick(&self, border: &Border, radius: f32, occupied: &[(Vec2, f32)]) -> Vec2;
}

/// Uniformly random in-bounds point.
#[derive(Debug, Default)]
pub struct RandomSpawn;

impl SpawnPolicy for RandomSpawn {
    fn name(&self) -> &str {
        "random"
    }

    fn pick(&self, border: &Border, radius: f32, _occupied: &[(Vec2, f32)]) -> Vec2 {
        border.random_position(radius)
    }
}

/// Best of a candidate set, maximising the gap to the nearest live cell.
#[derive(Debug)]
pub struct FarthestSpawn {
    pub candidates: usize,
}

impl Default for FarthestSpawn {
    fn default() -> Self {
        Self {
            candidates: SPAWN_CANDIDATES,
        }
    }
}

impl SpawnPolicy for FarthestSpawn {
    fn name(&self) -> &str {
        "farthest"
    }

    fn pick(&self, border: &Border, radius: f32, occupied: &[(Vec2, f32)]) -> Vec2 {
        if occupied.is_empty() {
            return border.random_position(radius);
        }
        let gap = |point: Vec2| {
            occupied
                .iter()
                .map(|&(position, other)| point.distance(position) - other - radius)
                .fold(f32::INFINITY, f32::min)
        };

        let mut best = border.random_position(radius);
        let mut best_gap = gap(best);
        for _ in 1..self.candidates.max(1) {
            let candidate = border.random_position(radius);
            let candidate_gap = gap(candidate);
            if candidate_gap > best_gap {
                best = candidate;
                best_gap = candidate_gap;
            }
        }
        best
    }
}

/// Build the policy named in the configuration.
pub fn get_spawn_policy(strategy: SpawnStrategy) -> Box<dyn SpawnPolicy> {
    match strategy {
        SpawnStrategy::Random => Box::new(RandomSpawn),
        SpawnStrategy::Farthest => Box::new(FarthestSpawn::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_picks_stay_in_bounds() {
        let border = Border::new(500.0, 300.0);
        let occupied = [(Vec2::new(250.0, 150.0), 40.0)];
        for strategy in [SpawnStrategy::Random, SpawnStrategy::Farthest] {
            let policy = get_spawn_policy(strategy);
            for _ in 0..50 {
                assert!(border.contains(policy.pick(&border, 20.0, &occupied)));
                assert!(border.contains(policy.pick(&border, 20.0, &[])));
            }
        }
    }

    #[test]
    fn test_farthest_avoids_crowded_corner() {
        // A large blob covering most of the map: the best of many candidates
        // must land outside it.
        let border = Border::new(1000.0, 1000.0);
        let occupied = [(Vec2::new(0.0, 0.0), 900.0)];
        let policy = FarthestSpawn { candidates: 200 };
        let point = policy.pick(&border, 10.0, &occupied);
        assert!(point.distance(Vec2::ZERO) > 900.0);
    }
}
