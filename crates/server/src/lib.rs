//! Authoritative arena simulation and its session boundary.

pub mod balance;
pub mod collision;
pub mod config;
pub mod entity;
pub mod error;
pub mod leaderboard;
pub mod naming;
pub mod server;
pub mod spawn;
pub mod split;
pub mod visibility;
pub mod world;

// Re-export commonly used types
pub use config::Config;
pub use error::GameError;
pub use server::{run, spawn_game, GameHandle, GameState, PlayerSummary};
