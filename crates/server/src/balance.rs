//! Mass economy balancer, run once per slow tick.

use crate::config::Config;
use crate::spawn::{FarthestSpawn, RandomSpawn, SpawnPolicy};
use crate::world::World;
use rand::Rng;

/// What one balance pass did.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct BalanceReport {
    pub decayed: f32,
    pub food_added: usize,
    pub food_removed: usize,
    pub viruses_added: usize,
}

/// Run decay, then bring food and viruses back in line with their budgets.
pub fn balance(world: &mut World, config: &Config) -> BalanceReport {
    let decayed = decay_cells(world, config);
    let (food_added, food_removed) = balance_food(world, config);
    let viruses_added = replenish_viruses(world, config);
    BalanceReport {
        decayed,
        food_added,
        food_removed,
        viruses_added,
    }
}

/// Shrink every cell above the default mass. Returns the total mass lost.
///
/// Each cell loses `mass * decay_rate`, at least `min_decay`, and never drops
/// below the default mass.
pub fn decay_cells(world: &mut World, config: &Config) -> f32 {
    let floor = config.player.default_mass as f32;
    let rate = config.player.decay_rate as f32;
    let min_loss = config.player.min_decay as f32;

    let mut lost = 0.0;
    for player in world.players_mut() {
        for cell in &mut player.cells {
            let mass = cell.mass();
            if mass <= floor {
                continue;
            }
            let next = (mass - (mass * rate).max(min_loss)).max(floor);
            lost += mass - next;
            cell.set_mass(next);
        }
    }
    lost
}

/// Steer the food population towards the global mass budget.
///
/// The food target is what is left of `border.game_mass` after the players'
/// mass, capped by `food.max_amount`. Returns `(added, removed)`.
pub fn balance_food(world: &mut World, config: &Config) -> (usize, usize) {
    let food_mass = config.food.mass as f32;
    let max_food = config.food.max_amount;
    let player_mass: f32 = world.players().iter().map(|p| p.mass_total()).sum();

    let budget = (config.border.game_mass as f32 - player_mass).max(0.0);
    let target = if food_mass > 0.0 {
        ((budget / food_mass).floor() as usize).min(max_food)
    } else {
        max_food
    };

    let current = world.food.len();
    if current < target {
        let radius = crate::entity::mass_to_radius(food_mass);
        for _ in current..target {
            let position = world.border.random_position(radius);
            world.add_food(position, food_mass, World::random_hue());
        }
        (target - current, 0)
    } else {
        world.food.truncate(target);
        (0, current - target)
    }
}

/// Top viruses up to `virus.max_amount`, never past it.
pub fn replenish_viruses(world: &mut World, config: &Config) -> usize {
    let max = config.virus.max_amount;
    if world.viruses.len() >= max {
        return 0;
    }
    let policy: Box<dyn SpawnPolicy> = if config.virus.avoid_players {
        Box::new(FarthestSpawn::default())
    } else {
        Box::new(RandomSpawn)
    };

    let (min_mass, max_mass) = (config.virus.min_mass as f32, config.virus.max_mass as f32);
    let mut rng = rand::rng();
    let occupied = world.occupied();
    let missing = max - world.viruses.len();
    for _ in 0..missing {
        let mass = if max_mass > min_mass {
            rng.random_range(min_mass..=max_mass)
        } else {
            min_mass
        };
        let radius = crate::entity::mass_to_radius(mass);
        let position = policy.pick(&world.border, radius, &occupied);
        world.add_virus(position, mass);
    }
    missing
}
