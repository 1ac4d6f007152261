//! Session registry and player state store for Skyfall.
//!
//! This crate owns the server's authoritative record of who is connected:
//!
//! 1. **Player state**: [`PlayerState`] with an explicit [`Presence`]
//!    (connected but anonymous vs. named and visible) and [`Vitals`]
//!    (alive, dying, waiting to respawn).
//! 2. **Store**: [`PlayerStore`], the map from [`PlayerId`] to state.
//! 3. **Sessions**: [`SessionRegistry`], which maps live connections to
//!    player ids and creates/removes the store entry alongside them.
//!
//! Nothing here is thread-safe on its own. The arena actor owns the
//! registry and serialises all access.
//!
//! [`PlayerId`]: skyfall_protocol::PlayerId

mod error;
mod player;
mod registry;

pub use error::SessionError;
pub use player::{PlayerDefaults, PlayerState, PlayerStore, Presence, UNNAMED, Vitals};
pub use registry::SessionRegistry;
