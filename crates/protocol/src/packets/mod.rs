//! Packet definitions for the arena protocol.
//!
//! Every frame is a JSON text message of the form `{"type": ..., "data": ...}`.
//! Packets without a payload omit `data`.

mod client;
mod server;

pub use client::*;
pub use server::*;
