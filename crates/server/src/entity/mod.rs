//! Game entities.
//!
//! Plain records for everything that lives in the world. Behaviour beyond
//! keeping mass and radius in step lives in the resolver, balancer and
//! split engine.

mod cell;
mod food;
mod mass_pellet;
mod player;
mod virus;

pub use cell::{mass_to_radius, Cell};
pub use food::Food;
pub use mass_pellet::MassPellet;
pub use player::{Player, PlayerId};
pub use virus::Virus;

/// Identifier for food, pellets and viruses. Players use their connection id.
pub type EntityId = u32;
