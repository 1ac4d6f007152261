//! Wire protocol for Skyfall.
//!
//! This crate defines what clients and the server say to each other:
//!
//! - **Types** ([`ClientMessage`], [`ServerMessage`], [`Envelope`],
//!   [`Transform`], ...): the structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those structures
//!   become bytes and back.
//! - **Errors** ([`ProtocolError`]): what can go wrong while doing so.
//!
//! The protocol layer knows nothing about connections or game rules. It
//! sits between the transport (raw frames) and the arena (player state):
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope<ClientMessage>) → Arena
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    Channel, ClientMessage, Envelope, PlayerId, PlayerSnapshot, Projectile,
    Recipient, ServerMessage, Transform, Vec3,
};
