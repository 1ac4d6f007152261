//! Error types for the session layer.

use skyfall_protocol::PlayerId;
use skyfall_transport::ConnectionId;

/// Errors that can occur while registering or releasing sessions.
///
/// Callers above the registry mostly treat these as "nothing to do":
/// a release for an id that is already gone is a normal race.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No player with this id is registered.
    #[error("session not found for player {0}")]
    NotFound(PlayerId),

    /// No session exists for this connection.
    #[error("no session for connection {0}")]
    UnknownConnection(ConnectionId),

    /// The connection already has a player assigned.
    #[error("connection {0} is already registered")]
    AlreadyRegistered(ConnectionId),
}
