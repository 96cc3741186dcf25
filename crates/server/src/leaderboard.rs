//! Leaderboard with change detection.

use crate::entity::{Player, PlayerId};
use protocol::packets::{LeaderboardEntry, LeaderboardUpdate};

/// Ranked top-N view. Recomputed on the slow tick, shipped on the broadcast
/// tick only when the ranking moved.
#[derive(Debug)]
pub struct LeaderboardTracker {
    size: usize,
    ranking: Vec<(PlayerId, String)>,
    player_count: usize,
    changed: bool,
}

impl LeaderboardTracker {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            ranking: Vec::new(),
            player_count: 0,
            changed: false,
        }
    }

    /// Rank `players` by total mass. Returns whether the top-N ids or their
    /// order differ from the previous ranking.
    pub fn recompute(&mut self, players: &[Player]) -> bool {
        let mut ranked: Vec<(f32, &Player)> = players.iter().map(|p| (p.mass_total(), p)).collect();
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.id.cmp(&b.1.id)));
        ranked.truncate(self.size);

        self.player_count = players.len();
        let same = ranked.len() == self.ranking.len()
            && ranked.iter().zip(&self.ranking).all(|((_, p), (id, _))| p.id == *id);
        if same {
            return false;
        }
        self.ranking = ranked.into_iter().map(|(_, p)| (p.id, p.name.clone())).collect();
        self.changed = true;
        true
    }

    /// Current ranking, regardless of the change flag.
    pub fn current(&self) -> LeaderboardUpdate {
        LeaderboardUpdate {
            players: self.player_count,
            leaderboard: self
                .ranking
                .iter()
                .map(|(id, name)| LeaderboardEntry {
                    id: *id,
                    name: name.clone(),
                })
                .collect(),
        }
    }

    /// The ranking if it changed since the last call, clearing the flag.
    pub fn take_changed(&mut self) -> Option<LeaderboardUpdate> {
        if !self.changed {
            return None;
        }
        self.changed = false;
        Some(self.current())
    }
}
