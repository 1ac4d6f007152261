//! The authoritative game core for Skyfall.
//!
//! An arena holds every connected player and decides what happens when
//! they name themselves, move, shoot, hit, and kill each other.
//!
//! # Key types
//!
//! - [`Arena`]: synchronous state plus the presence, movement and combat
//!   rules. Testable without a network or a runtime.
//! - [`ArenaHandle`]: talk to an arena running as a Tokio actor
//!   (see [`spawn_arena`])
//! - [`Broadcaster`]: the all / all-except / one-player fan-out
//! - [`ArenaConfig`]: health, spawn point, respawn delay, queue sizes
//! - [`Rejection`]: why a client message was dropped

mod actor;
mod arena;
mod broadcast;
mod combat;
mod config;
mod error;
mod movement;
mod presence;

pub use actor::{ArenaHandle, spawn_arena};
pub use arena::{Arena, RespawnTicket};
pub use broadcast::{Broadcaster, OutboundReceiver, OutboundSender, outbound_channel};
pub use config::ArenaConfig;
pub use error::{ArenaError, Rejection};
