//! Collision detection and consumption.
//!
//! Two passes per physics tick:
//! - [`resolve_consumption`]: cells against food, mass pellets and viruses,
//!   discovered first and applied afterwards so no collection is mutated
//!   mid-scan. Virus hits feed the forced-split path.
//! - [`resolve_player_eating`]: cells of different players eating each other.
//!
//! Thresholds are intentionally asymmetric: pellets and enemy cells need a
//! 10% margin, viruses only need to be lighter.

use crate::config::Config;
use crate::entity::{Cell, Player, PlayerId};
use crate::split;
use crate::world::World;
use fixedbitset::FixedBitSet;
use std::collections::BTreeMap;

/// Mass ratio an eater must strictly exceed.
pub const EAT_MARGIN: f32 = 1.1;

/// Whether a cell of `cell_mass` may eat a pellet of `pellet_mass`.
#[inline]
pub fn can_eat_pellet(cell_mass: f32, pellet_mass: f32) -> bool {
    cell_mass > pellet_mass * EAT_MARGIN
}

/// Whether a cell of `eater_mass` may eat an enemy cell of `target_mass`.
#[inline]
pub fn can_eat_cell(eater_mass: f32, target_mass: f32) -> bool {
    eater_mass > target_mass * EAT_MARGIN
}

/// Whether a cell of `cell_mass` swallows a virus of `virus_mass`. No margin.
#[inline]
pub fn can_eat_virus(cell_mass: f32, virus_mass: f32) -> bool {
    cell_mass > virus_mass
}

/// What one consumption pass did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConsumptionReport {
    pub food: usize,
    pub pellets: usize,
    pub viruses: usize,
}

/// Cells against food, pellets and viruses.
pub fn resolve_consumption(world: &mut World, config: &Config, tick: u64) -> ConsumptionReport {
    // Phase A: discovery. Each item is claimed by the first cell that can eat it.
    let mut food_claimed = FixedBitSet::with_capacity(world.food.len());
    let mut pellet_claimed = FixedBitSet::with_capacity(world.pellets.len());
    let mut virus_claimed = FixedBitSet::with_capacity(world.viruses.len());
    let mut gains: Vec<(usize, usize, f32)> = Vec::new();
    let mut virus_hits: BTreeMap<(usize, usize), f32> = BTreeMap::new();

    for (player_idx, player) in world.players().iter().enumerate() {
        for (cell_idx, cell) in player.cells.iter().enumerate() {
            let mut gained = 0.0;

            for (i, food) in world.food.iter().enumerate() {
                if !food_claimed.contains(i) && cell.contains_point(food.position) {
                    food_claimed.insert(i);
                    gained += food.mass;
                }
            }

            for (i, pellet) in world.pellets.iter().enumerate() {
                if pellet_claimed.contains(i)
                    || !cell.contains_point(pellet.position)
                    || pellet.is_guarded_from(cell)
                    || !can_eat_pellet(cell.mass(), pellet.mass)
                {
                    continue;
                }
                pellet_claimed.insert(i);
                gained += pellet.mass;
            }

            for (i, virus) in world.viruses.iter().enumerate() {
                if !virus_claimed.contains(i)
                    && cell.contains_point(virus.position)
                    && can_eat_virus(cell.mass(), virus.mass)
                {
                    virus_claimed.insert(i);
                    *virus_hits.entry((player_idx, cell_idx)).or_default() += virus.mass;
                }
            }

            if gained > 0.0 {
                gains.push((player_idx, cell_idx, gained));
            }
        }
    }

    let report = ConsumptionReport {
        food: food_claimed.count_ones(..),
        pellets: pellet_claimed.count_ones(..),
        viruses: virus_claimed.count_ones(..),
    };

    // Phase B: apply.
    for (player_idx, cell_idx, gained) in gains {
        world.players_mut()[player_idx].cells[cell_idx].add_mass(gained);
    }
    world.remove_food(&food_claimed);
    world.remove_pellets(&pellet_claimed);
    world.remove_viruses(&virus_claimed);

    // Children are appended, so queued cell indices stay valid.
    let border = world.border;
    for ((player_idx, cell_idx), virus_mass) in virus_hits {
        let player = &mut world.players_mut()[player_idx];
        split::forced_split(player, cell_idx, virus_mass, config, tick, &border);
    }

    report
}

/// A player whose last cell was eaten.
#[derive(Debug)]
pub struct PlayerDeath {
    pub victim: Player,
    pub eaten_by: PlayerId,
}

/// Cells of different players eating each other.
///
/// The eater's circle must contain the target's centre and its mass must beat
/// the target by [`EAT_MARGIN`]. Heavier cells act first; a cell that gets
/// eaten does not eat, and one eater takes every eligible target in the same
/// tick. Players left without cells are removed from the world and returned.
pub fn resolve_player_eating(world: &mut World) -> Vec<PlayerDeath> {
    struct Slot {
        player_idx: usize,
        cell_idx: usize,
        owner: PlayerId,
    }

    let players = world.players();
    let mut slots: Vec<Slot> = Vec::new();
    let mut cells: Vec<&Cell> = Vec::new();
    for (player_idx, player) in players.iter().enumerate() {
        for (cell_idx, cell) in player.cells.iter().enumerate() {
            slots.push(Slot {
                player_idx,
                cell_idx,
                owner: player.id,
            });
            cells.push(cell);
        }
    }
    if players.len() < 2 {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..cells.len()).collect();
    order.sort_by(|&a, &b| cells[b].mass().total_cmp(&cells[a].mass()));

    let mut eaten = FixedBitSet::with_capacity(cells.len());
    let mut gains: Vec<(usize, f32)> = Vec::new();
    let mut killer: Vec<Option<PlayerId>> = vec![None; cells.len()];

    for &eater in &order {
        if eaten.contains(eater) {
            continue;
        }
        let mut gained = 0.0;
        for target in 0..cells.len() {
            if target == eater || eaten.contains(target) || slots[target].owner == slots[eater].owner {
                continue;
            }
            if cells[eater].contains_point(cells[target].position)
                && can_eat_cell(cells[eater].mass(), cells[target].mass())
            {
                eaten.insert(target);
                killer[target] = Some(slots[eater].owner);
                gained += cells[target].mass();
            }
        }
        if gained > 0.0 {
            gains.push((eater, gained));
        }
    }

    if eaten.is_clear() {
        return Vec::new();
    }

    // Remember who ate each player's last cell before mutating anything.
    let mut last_killer: BTreeMap<PlayerId, PlayerId> = BTreeMap::new();
    for index in eaten.ones() {
        if let Some(by) = killer[index] {
            last_killer.insert(slots[index].owner, by);
        }
    }

    let positions: Vec<(usize, usize)> = slots.iter().map(|s| (s.player_idx, s.cell_idx)).collect();
    for (slot, gained) in gains {
        let (player_idx, cell_idx) = positions[slot];
        world.players_mut()[player_idx].cells[cell_idx].add_mass(gained);
    }

    let mut flat = 0;
    for player in world.players_mut() {
        player.cells.retain(|_| {
            let keep = !eaten.contains(flat);
            flat += 1;
            keep
        });
    }

    world
        .remove_empty_players()
        .into_iter()
        .map(|victim| PlayerDeath {
            eaten_by: last_killer.get(&victim.id).copied().unwrap_or_default(),
            victim,
        })
        .collect()
}
