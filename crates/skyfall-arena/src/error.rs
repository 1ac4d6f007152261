//! Error types for the arena layer.

use skyfall_protocol::PlayerId;
use skyfall_session::SessionError;
use skyfall_transport::ConnectionId;

/// Errors returned by [`ArenaHandle`](crate::ArenaHandle) operations.
#[derive(Debug, thiserror::Error)]
pub enum ArenaError {
    /// The arena actor has stopped or its command channel is closed.
    #[error("arena is unavailable")]
    Unavailable,

    /// Registering the connection failed.
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Why a client message was dropped without effect.
///
/// These never travel back to the client. The arena logs them at debug
/// level and moves on: a stale or forged claim is not an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// The message came from a connection with no session.
    #[error("no session for connection {0}")]
    UnknownSender(ConnectionId),

    /// The sender has not completed naming yet.
    #[error("sender {0} has not named themselves")]
    SenderNotActive(PlayerId),

    /// The target id does not belong to a connected player.
    #[error("target {0} is not connected")]
    UnknownTarget(PlayerId),

    /// The target is already dead and waiting to respawn.
    #[error("target {0} already has a death pending")]
    TargetDying(PlayerId),

    /// A kill was claimed while the target still has health left.
    #[error("target {0} still has health")]
    TargetStillAlive(PlayerId),

    /// The requested display name is empty after trimming.
    #[error("display name is empty")]
    EmptyName,
}
