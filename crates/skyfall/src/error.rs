//! Unified error type for the Skyfall server.

use skyfall_arena::ArenaError;
use skyfall_protocol::ProtocolError;
use skyfall_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum SkyfallError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The arena actor is gone or refused the connection. Session
    /// registry failures arrive here too, wrapped by the arena.
    #[error(transparent)]
    Arena(#[from] ArenaError),

    /// A configuration value is missing or malformed.
    #[error("invalid configuration: {0}")]
    Config(String),
}
