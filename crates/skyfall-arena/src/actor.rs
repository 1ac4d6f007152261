//! Arena actor: a Tokio task that owns the [`Arena`].
//!
//! Connection handlers never touch player state directly. They send
//! commands through an [`ArenaHandle`], and the actor applies them one at
//! a time. That single consumer is what serialises every mutation and
//! gives combat resolution a consistent view of all players.
//!
//! Respawns re-enter through the same channel: an accepted kill spawns a
//! timer task that sleeps, then sends [`ArenaCommand::Respawn`]. The timer
//! is never cancelled; if the player left in the meantime the command is
//! a no-op.

use skyfall_protocol::{ClientMessage, PlayerId};
use skyfall_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};

use crate::{
    Arena, ArenaConfig, ArenaError, OutboundReceiver, OutboundSender,
    Rejection, RespawnTicket, outbound_channel,
};

/// Commands sent to the arena actor.
///
/// Variants carrying a `oneshot::Sender` expect a reply; the rest are
/// fire-and-forget.
pub(crate) enum ArenaCommand {
    /// A new connection wants a player id.
    Connect {
        conn: ConnectionId,
        sender: OutboundSender,
        reply: oneshot::Sender<Result<PlayerId, ArenaError>>,
    },

    /// A decoded message from a connection.
    Client {
        conn: ConnectionId,
        msg: ClientMessage,
    },

    /// The connection is gone.
    Disconnect { conn: ConnectionId },

    /// A respawn timer fired.
    Respawn { player_id: PlayerId },

    /// How many sessions are live.
    PlayerCount { reply: oneshot::Sender<usize> },

    /// Stop the actor.
    Shutdown,
}

/// Handle to a running arena actor.
///
/// Cheap to clone: an `mpsc::Sender` plus a queue depth.
#[derive(Clone)]
pub struct ArenaHandle {
    sender: mpsc::Sender<ArenaCommand>,
    unreliable_queue_depth: usize,
}

impl ArenaHandle {
    /// Registers a connection.
    ///
    /// Returns the assigned id and the receiving end of the session's
    /// outbound queues. The welcome messages are already queued on it.
    pub async fn connect(
        &self,
        conn: ConnectionId,
    ) -> Result<(PlayerId, OutboundReceiver), ArenaError> {
        let (tx, rx) = outbound_channel(self.unreliable_queue_depth);
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(ArenaCommand::Connect {
                conn,
                sender: tx,
                reply: reply_tx,
            })
            .await
            .map_err(|_| ArenaError::Unavailable)?;
        let player_id =
            reply_rx.await.map_err(|_| ArenaError::Unavailable)??;
        Ok((player_id, rx))
    }

    /// Forwards a client message (fire-and-forget).
    pub async fn client_message(
        &self,
        conn: ConnectionId,
        msg: ClientMessage,
    ) -> Result<(), ArenaError> {
        self.sender
            .send(ArenaCommand::Client { conn, msg })
            .await
            .map_err(|_| ArenaError::Unavailable)
    }

    /// Releases the connection's session.
    pub async fn disconnect(&self, conn: ConnectionId) -> Result<(), ArenaError> {
        self.sender
            .send(ArenaCommand::Disconnect { conn })
            .await
            .map_err(|_| ArenaError::Unavailable)
    }

    /// Number of live sessions. Also useful as a barrier: the reply comes
    /// after every command sent before it has been applied.
    pub async fn player_count(&self) -> Result<usize, ArenaError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(ArenaCommand::PlayerCount { reply: reply_tx })
            .await
            .map_err(|_| ArenaError::Unavailable)?;
        reply_rx.await.map_err(|_| ArenaError::Unavailable)
    }

    /// Tells the actor to stop.
    pub async fn shutdown(&self) -> Result<(), ArenaError> {
        self.sender
            .send(ArenaCommand::Shutdown)
            .await
            .map_err(|_| ArenaError::Unavailable)
    }
}

/// Spawns an arena actor and returns a handle to it.
///
/// Must be called from within a Tokio runtime.
pub fn spawn_arena(config: ArenaConfig) -> ArenaHandle {
    let (tx, rx) = mpsc::channel(config.command_channel_size.max(1));
    let handle = ArenaHandle {
        sender: tx.clone(),
        unreliable_queue_depth: config.unreliable_queue_depth,
    };

    let actor = ArenaActor {
        arena: Arena::new(config),
        receiver: rx,
        timers: tx.downgrade(),
    };
    tokio::spawn(actor.run());

    handle
}

struct ArenaActor {
    arena: Arena,
    receiver: mpsc::Receiver<ArenaCommand>,
    /// Lets respawn timers reach the actor without keeping it alive.
    timers: mpsc::WeakSender<ArenaCommand>,
}

impl ArenaActor {
    async fn run(mut self) {
        tracing::info!("arena actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                ArenaCommand::Connect {
                    conn,
                    sender,
                    reply,
                } => {
                    let result = self
                        .arena
                        .connect(conn, sender)
                        .map_err(ArenaError::from);
                    let _ = reply.send(result);
                }
                ArenaCommand::Client { conn, msg } => {
                    self.handle_client(conn, msg);
                }
                ArenaCommand::Disconnect { conn } => {
                    if self.arena.disconnect(conn).is_none() {
                        tracing::debug!(%conn, "disconnect for unknown connection");
                    }
                }
                ArenaCommand::Respawn { player_id } => {
                    self.arena.respawn(player_id);
                }
                ArenaCommand::PlayerCount { reply } => {
                    let _ = reply.send(self.arena.player_count());
                }
                ArenaCommand::Shutdown => {
                    tracing::info!("arena shutting down");
                    break;
                }
            }
        }

        tracing::info!("arena actor stopped");
    }

    fn handle_client(&mut self, conn: ConnectionId, msg: ClientMessage) {
        match self.arena.handle(conn, msg) {
            Ok(Some(ticket)) => self.schedule_respawn(ticket),
            Ok(None) => {}
            Err(Rejection::UnknownSender(conn)) => {
                tracing::warn!(%conn, "message from unknown connection");
            }
            Err(rejection) => {
                tracing::debug!(%conn, %rejection, "client message rejected");
            }
        }
    }

    /// Arms a detached timer for an accepted kill.
    fn schedule_respawn(&mut self, ticket: RespawnTicket) {
        self.arena.mark_respawn_scheduled(ticket.player_id);
        let timers = self.timers.clone();

        tokio::spawn(async move {
            tokio::time::sleep(ticket.delay).await;
            let Some(sender) = timers.upgrade() else {
                return;
            };
            let _ = sender
                .send(ArenaCommand::Respawn {
                    player_id: ticket.player_id,
                })
                .await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_spawn_arena_connect_and_count() {
        let handle = spawn_arena(ArenaConfig::default());

        let (pid, mut rx) = handle.connect(ConnectionId::new(1)).await.unwrap();

        assert_eq!(handle.player_count().await.unwrap(), 1);
        assert_eq!(
            rx.try_recv(),
            Some(skyfall_protocol::ServerMessage::IdentityAssigned { player_id: pid })
        );
    }

    #[tokio::test]
    async fn test_connect_duplicate_connection_returns_session_error() {
        let handle = spawn_arena(ArenaConfig::default());
        handle.connect(ConnectionId::new(1)).await.unwrap();

        let result = handle.connect(ConnectionId::new(1)).await;

        assert!(matches!(result, Err(ArenaError::Session(_))));
    }

    #[tokio::test]
    async fn test_handle_after_shutdown_returns_unavailable() {
        let handle = spawn_arena(ArenaConfig::default());
        handle.shutdown().await.unwrap();

        let result = handle.player_count().await;

        assert!(matches!(result, Err(ArenaError::Unavailable)));
    }
}
