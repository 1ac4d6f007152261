//! # Skyfall
//!
//! Authoritative real-time server for a multiplayer flight and combat
//! game.
//!
//! Clients connect over WebSocket, name themselves, and then stream
//! positions, projectiles, hits, and kill claims. The server owns every
//! player's identity, health, and death state, and fans out the events
//! each client needs to render everybody else.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use skyfall::prelude::*;
//!
//! # async fn start() -> Result<(), SkyfallError> {
//! let config = ServerConfig::from_env()?;
//! let server = SkyfallServer::builder().config(config).build().await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use error::SkyfallError;
pub use server::{SkyfallServer, SkyfallServerBuilder};

/// Everything needed to run a server or write a test client.
pub mod prelude {
    pub use crate::{ServerConfig, SkyfallError, SkyfallServer, SkyfallServerBuilder};
    pub use skyfall_arena::{ArenaConfig, ArenaHandle};
    pub use skyfall_protocol::{
        Channel, ClientMessage, Codec, Envelope, JsonCodec, PlayerId,
        PlayerSnapshot, Projectile, ServerMessage, Transform, Vec3,
    };
}
