//! Split and merge engine.
//!
//! The per-player cell cap is enforced here for both the voluntary and the
//! virus-forced path. A split that does not fit is dropped whole.

use crate::config::Config;
use crate::entity::{Cell, Player};
use crate::world::Border;
use glam::Vec2;
use std::f32::consts::TAU;

/// Distance per tick that overlapping own cells are pushed apart.
pub const PUSHING_AWAY_SPEED: f32 = 1.1;
/// Own cells merge once their centres are closer than this share of the
/// radius sum.
const MERGE_OVERLAP: f32 = 1.75;

/// Player-initiated split. Returns how many cells were split.
///
/// Heaviest cells go first. A cell needs twice the default mass to split and
/// becomes two halves; the new half is launched at split speed.
pub fn voluntary_split(player: &mut Player, config: &Config, tick: u64, border: &Border) -> usize {
    let min_mass = config.player.default_mass as f32 * 2.0;
    let cap = config.player.max_cells;

    let mut eligible: Vec<usize> = (0..player.cells.len())
        .filter(|&i| player.cells[i].mass() >= min_mass)
        .collect();
    eligible.sort_by(|&a, &b| player.cells[b].mass().total_cmp(&player.cells[a].mass()));

    let aim = player.aim();
    let mut splits = 0;
    for idx in eligible {
        if player.cells.len() >= cap {
            break;
        }
        let seq = player.next_split_seq();
        let cell = &mut player.cells[idx];
        let half = cell.mass() / 2.0;
        cell.set_mass(half);
        cell.split_seq = seq;

        let direction = (aim - cell.position).try_normalize().unwrap_or(Vec2::X);
        let position = border.clamp(cell.position + direction * cell.radius() / 2.0, cell.radius() / 3.0);
        let child = Cell::new(player.id, position, half, config.player.split_speed as f32, seq);
        player.cells.push(child);
        splits += 1;
    }

    if splits > 0 {
        player.last_split_tick = Some(tick);
    }
    splits
}

/// Virus-forced split of `player.cells[cell_idx]`.
///
/// The virus mass joins the cell, and the total is shared evenly between as
/// many pieces as the default mass and the remaining cap allow. Returns the
/// number of new cells.
pub fn forced_split(
    player: &mut Player,
    cell_idx: usize,
    virus_mass: f32,
    config: &Config,
    tick: u64,
    border: &Border,
) -> usize {
    let default_mass = config.player.default_mass as f32;
    let room = config.player.max_cells.saturating_sub(player.cells.len()) + 1;

    let Some(cell) = player.cells.get_mut(cell_idx) else {
        return 0;
    };
    let total = cell.mass() + virus_mass;
    let by_mass = if default_mass > 0.0 {
        (total / default_mass).floor() as usize
    } else {
        room
    };
    let pieces = by_mass.min(room);
    if pieces <= 1 {
        cell.add_mass(virus_mass);
        return 0;
    }

    let share = total / pieces as f32;
    cell.set_mass(share);
    let origin = cell.position;
    let spread = cell.radius();
    let margin = spread / 3.0;

    let mut children = Vec::with_capacity(pieces - 1);
    for piece in 1..pieces {
        let seq = player.next_split_seq();
        let angle = TAU * piece as f32 / pieces as f32;
        let position = border.clamp(origin + Vec2::from_angle(angle) * spread, margin);
        children.push(Cell::new(player.id, position, share, config.player.split_speed as f32, seq));
    }
    player.cells.extend(children);
    player.last_split_tick = Some(tick);
    pieces - 1
}

/// Merge own cells once the merge timer has run out, otherwise push
/// overlapping ones apart.
pub fn merge_or_separate(player: &mut Player, config: &Config, tick: u64, border: &Border) {
    if player.cells.len() < 2 {
        return;
    }

    if player.can_merge(tick, config.merge_ticks()) {
        let mut i = 0;
        while i < player.cells.len() {
            let mut j = i + 1;
            while j < player.cells.len() {
                let (a, b) = (&player.cells[i], &player.cells[j]);
                let reach = (a.radius() + b.radius()) / MERGE_OVERLAP;
                if a.position.distance(b.position) < reach {
                    let absorbed = player.cells.swap_remove(j);
                    player.cells[i].add_mass(absorbed.mass());
                    continue;
                }
                j += 1;
            }
            i += 1;
        }
        return;
    }

    for i in 0..player.cells.len() {
        for j in i + 1..player.cells.len() {
            let (a, b) = (&player.cells[i], &player.cells[j]);
            if a.position.distance(b.position) >= a.radius() + b.radius() {
                continue;
            }
            let direction = (b.position - a.position).try_normalize().unwrap_or(Vec2::X);
            let push = direction * PUSHING_AWAY_SPEED;
            let (ra, rb) = (a.radius(), b.radius());
            player.cells[i].position = border.clamp(player.cells[i].position - push, ra / 3.0);
            player.cells[j].position = border.clamp(player.cells[j].position + push, rb / 3.0);
        }
    }
}
