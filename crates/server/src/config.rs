//! Server configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub border: BorderConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub food: FoodConfig,
    #[serde(default)]
    pub virus: VirusConfig,
    #[serde(default)]
    pub eject: EjectConfig,
}

impl Config {
    /// Load configuration from `config.toml` or use defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = Path::new("config.toml");
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Self::from_toml_str(&contents)
        } else {
            info!("No config.toml found, creating default config");
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            Ok(default_config)
        }
    }

    /// Parse a configuration document.
    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Physics ticks needed for split cells to become mergeable again.
    pub fn merge_ticks(&self) -> u64 {
        let tick_ms = self.server.physics_tick_ms.max(1) as f64;
        (self.player.merge_time * 1000.0 / tick_ms).ceil() as u64
    }
}

/// Server networking and scheduling settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Server name shown in logs and status routes.
    #[serde(default = "default_name")]
    pub name: String,
    /// Physics tick interval in milliseconds.
    #[serde(default = "default_physics_tick")]
    pub physics_tick_ms: u64,
    /// Slow (balance/leaderboard) tick interval in milliseconds.
    #[serde(default = "default_slow_tick")]
    pub slow_tick_ms: u64,
    /// Snapshot broadcasts per second.
    #[serde(default = "default_network_update_factor")]
    pub network_update_factor: u32,
    /// Silence allowed before a player is evicted, in milliseconds.
    #[serde(default = "default_heartbeat_timeout")]
    pub heartbeat_timeout_ms: u64,
    /// Admin secret (empty = admin login disabled).
    #[serde(default)]
    pub admin_password: String,
    /// Write chat lines to the log.
    #[serde(default)]
    pub log_chat: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            name: default_name(),
            physics_tick_ms: default_physics_tick(),
            slow_tick_ms: default_slow_tick(),
            network_update_factor: default_network_update_factor(),
            heartbeat_timeout_ms: default_heartbeat_timeout(),
            admin_password: String::new(),
            log_chat: false,
        }
    }
}

impl ServerConfig {
    pub fn physics_interval(&self) -> Duration {
        Duration::from_millis(self.physics_tick_ms.max(1))
    }

    pub fn slow_interval(&self) -> Duration {
        Duration::from_millis(self.slow_tick_ms.max(1))
    }

    pub fn broadcast_interval(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / self.network_update_factor.max(1) as u64)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_timeout_ms)
    }
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_name() -> String {
    "Arena".to_string()
}
fn default_physics_tick() -> u64 {
    16
}
fn default_slow_tick() -> u64 {
    1000
}
fn default_network_update_factor() -> u32 {
    40
}
fn default_heartbeat_timeout() -> u64 {
    5000
}

/// World border configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BorderConfig {
    #[serde(default = "default_border_size")]
    pub width: f64,
    #[serde(default = "default_border_size")]
    pub height: f64,
    /// Total mass (food plus players) the food economy steers towards.
    #[serde(default = "default_game_mass")]
    pub game_mass: f64,
}

impl Default for BorderConfig {
    fn default() -> Self {
        Self {
            width: default_border_size(),
            height: default_border_size(),
            game_mass: default_game_mass(),
        }
    }
}

fn default_border_size() -> f64 {
    5000.0
}
fn default_game_mass() -> f64 {
    20000.0
}

/// How a new player's spawn point is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpawnStrategy {
    /// Uniformly random in-bounds point.
    Random,
    /// Best of several random candidates, farthest from live player cells.
    #[default]
    Farthest,
}

/// Player configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerConfig {
    /// Starting mass; also the floor for decay and for split pieces.
    #[serde(default = "default_player_mass")]
    pub default_mass: f64,
    /// Base cell speed per physics tick.
    #[serde(default = "default_player_speed")]
    pub speed: f64,
    /// Logarithm base of the mass slow-down.
    #[serde(default = "default_slow_base")]
    pub slow_base: f64,
    /// Launch speed given to freshly split cells.
    #[serde(default = "default_split_speed")]
    pub split_speed: f64,
    #[serde(default = "default_player_max_cells")]
    pub max_cells: usize,
    /// Seconds before split cells may merge back.
    #[serde(default = "default_merge_time")]
    pub merge_time: f64,
    /// Fraction of a cell's mass lost per slow tick.
    #[serde(default = "default_decay_rate")]
    pub decay_rate: f64,
    /// Minimum mass lost per slow tick by a decaying cell.
    #[serde(default = "default_min_decay")]
    pub min_decay: f64,
    #[serde(default)]
    pub spawn: SpawnStrategy,
    #[serde(default = "default_max_nick_length")]
    pub max_nick_length: usize,
    #[serde(default = "default_leaderboard_size")]
    pub leaderboard_size: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_mass: default_player_mass(),
            speed: default_player_speed(),
            slow_base: default_slow_base(),
            split_speed: default_split_speed(),
            max_cells: default_player_max_cells(),
            merge_time: default_merge_time(),
            decay_rate: default_decay_rate(),
            min_decay: default_min_decay(),
            spawn: SpawnStrategy::default(),
            max_nick_length: default_max_nick_length(),
            leaderboard_size: default_leaderboard_size(),
        }
    }
}

fn default_player_mass() -> f64 {
    10.0
}
fn default_player_speed() -> f64 {
    6.25
}
fn default_slow_base() -> f64 {
    4.5
}
fn default_split_speed() -> f64 {
    20.0
}
fn default_player_max_cells() -> usize {
    16
}
fn default_merge_time() -> f64 {
    15.0
}
fn default_decay_rate() -> f64 {
    0.001
}
fn default_min_decay() -> f64 {
    0.01
}
fn default_max_nick_length() -> usize {
    25
}
fn default_leaderboard_size() -> usize {
    10
}

/// Food configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FoodConfig {
    #[serde(default = "default_food_mass")]
    pub mass: f64,
    #[serde(default = "default_food_max_amount")]
    pub max_amount: usize,
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self {
            mass: default_food_mass(),
            max_amount: default_food_max_amount(),
        }
    }
}

fn default_food_mass() -> f64 {
    1.0
}
fn default_food_max_amount() -> usize {
    1000
}

/// Virus configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VirusConfig {
    #[serde(default = "default_virus_min_mass")]
    pub min_mass: f64,
    #[serde(default = "default_virus_max_mass")]
    pub max_mass: f64,
    #[serde(default = "default_virus_max_amount")]
    pub max_amount: usize,
    /// Place new viruses away from player cells.
    #[serde(default = "default_virus_avoid_players")]
    pub avoid_players: bool,
}

impl Default for VirusConfig {
    fn default() -> Self {
        Self {
            min_mass: default_virus_min_mass(),
            max_mass: default_virus_max_mass(),
            max_amount: default_virus_max_amount(),
            avoid_players: default_virus_avoid_players(),
        }
    }
}

fn default_virus_min_mass() -> f64 {
    100.0
}
fn default_virus_max_mass() -> f64 {
    150.0
}
fn default_virus_max_amount() -> usize {
    50
}
fn default_virus_avoid_players() -> bool {
    true
}

/// Ejected mass configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EjectConfig {
    /// Mass of one pellet (taken from the ejecting cell).
    #[serde(default = "default_eject_mass")]
    pub mass: f64,
    /// Launch speed of a pellet.
    #[serde(default = "default_eject_speed")]
    pub speed: f64,
}

impl Default for EjectConfig {
    fn default() -> Self {
        Self {
            mass: default_eject_mass(),
            speed: default_eject_speed(),
        }
    }
}

fn default_eject_mass() -> f64 {
    20.0
}
fn default_eject_speed() -> f64 {
    25.0
}
