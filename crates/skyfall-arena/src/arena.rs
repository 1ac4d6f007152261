//! The arena: every connected player, and the rules that connect them.
//!
//! `Arena` is plain synchronous state. It owns the [`SessionRegistry`]
//! (and through it the player store) plus the [`Broadcaster`], and turns
//! one inbound event at a time into state changes and outbound messages.
//! It never sleeps and never awaits; the respawn delay is handed back to
//! the caller as a [`RespawnTicket`].
//!
//! The async shell around it lives in [`actor`](crate::actor).

use std::time::Duration;

use skyfall_protocol::{ClientMessage, PlayerId, ServerMessage};
use skyfall_session::{SessionError, SessionRegistry};
use skyfall_transport::ConnectionId;

use crate::{ArenaConfig, Broadcaster, OutboundSender, Rejection};

/// A respawn the caller must schedule.
///
/// Produced by an accepted kill. After `delay`, feed `player_id` back into
/// [`Arena::respawn`]. The ticket holds the id by value only; the player
/// may be gone by the time it is redeemed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RespawnTicket {
    pub player_id: PlayerId,
    pub delay: Duration,
}

/// Authoritative game state for one arena.
#[derive(Debug)]
pub struct Arena {
    pub(crate) registry: SessionRegistry,
    pub(crate) broadcaster: Broadcaster,
    pub(crate) config: ArenaConfig,
}

impl Arena {
    pub fn new(config: ArenaConfig) -> Self {
        Self {
            registry: SessionRegistry::new(config.player_defaults()),
            broadcaster: Broadcaster::new(),
            config,
        }
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Read-only view of the sessions and player store.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Number of connected players, named or not.
    pub fn player_count(&self) -> usize {
        self.registry.len()
    }

    /// Registers a new connection and sends it the welcome sequence.
    ///
    /// The new session receives, in order:
    /// 1. `IdentityAssigned` with its id
    /// 2. only if someone has already named themselves: `InitialRoster`
    ///    with every named player, then one `HealthSnapshot` per entry
    ///
    /// Nobody else hears about the new player until it names itself.
    pub fn connect(
        &mut self,
        conn: ConnectionId,
        sender: OutboundSender,
    ) -> Result<PlayerId, SessionError> {
        let player_id = self.registry.register(conn)?;
        self.broadcaster.attach(player_id, sender);

        self.broadcaster
            .to_player(player_id, ServerMessage::IdentityAssigned { player_id });

        let roster = self.registry.store().active_snapshots();
        if !roster.is_empty() {
            let snapshots: Vec<ServerMessage> = roster
                .iter()
                .map(|p| ServerMessage::HealthSnapshot {
                    player_id: p.id,
                    health: p.health,
                    max_health: p.max_health,
                })
                .collect();
            self.broadcaster.to_player(
                player_id,
                ServerMessage::InitialRoster { players: roster },
            );
            for msg in snapshots {
                self.broadcaster.to_player(player_id, msg);
            }
        }

        Ok(player_id)
    }

    /// Releases the connection's session.
    ///
    /// Named players are announced with `PlayerLeft` to everyone still
    /// connected; anonymous ones leave silently. Returns the released id,
    /// or `None` if the connection had no session.
    pub fn disconnect(&mut self, conn: ConnectionId) -> Option<PlayerId> {
        let player_id = self.registry.resolve(conn)?;
        self.broadcaster.detach(player_id);

        match self.registry.release(player_id) {
            Ok(Some(name)) => {
                tracing::info!(%player_id, %name, "player left");
                self.broadcaster
                    .to_all(ServerMessage::PlayerLeft { player_id, name });
            }
            Ok(None) => {
                tracing::debug!(%player_id, "anonymous session closed");
            }
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "release raced");
            }
        }

        Some(player_id)
    }

    /// Routes one client message to its handler.
    ///
    /// Returns a [`RespawnTicket`] when a kill was accepted. Every
    /// rejection is a silent drop as far as the client is concerned.
    /// Keep-alive and leave messages belong to the connection layer and
    /// are ignored here.
    pub fn handle(
        &mut self,
        conn: ConnectionId,
        msg: ClientMessage,
    ) -> Result<Option<RespawnTicket>, Rejection> {
        let player_id = self
            .registry
            .resolve(conn)
            .ok_or(Rejection::UnknownSender(conn))?;

        match msg {
            ClientMessage::SetName { name } => {
                self.set_name(player_id, &name)?;
            }
            ClientMessage::PositionUpdate { transform } => {
                self.update_transform(player_id, transform);
            }
            ClientMessage::ProjectileFired { projectile } => {
                self.fire_projectile(player_id, projectile)?;
            }
            ClientMessage::DamageReport {
                target_id,
                damage,
                resulting_health,
            } => {
                self.apply_damage(player_id, target_id, damage, resulting_health)?;
            }
            ClientMessage::KillClaim {
                target_id,
                target_name,
            } => {
                return self
                    .apply_kill(player_id, target_id, &target_name)
                    .map(Some);
            }
            ClientMessage::Heartbeat { .. } | ClientMessage::Leave { .. } => {}
        }

        Ok(None)
    }

    /// Resolves the sender and requires it to be named.
    pub(crate) fn active_name(
        &self,
        player_id: PlayerId,
    ) -> Result<String, Rejection> {
        self.registry
            .store()
            .get(&player_id)
            .and_then(|p| p.name())
            .map(str::to_owned)
            .ok_or(Rejection::SenderNotActive(player_id))
    }

    /// `HealthSnapshot` for a player, if they are still present.
    pub(crate) fn health_snapshot(
        &self,
        player_id: PlayerId,
    ) -> Option<ServerMessage> {
        self.registry.store().get(&player_id).map(|p| {
            ServerMessage::HealthSnapshot {
                player_id,
                health: p.health(),
                max_health: p.max_health,
            }
        })
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new(ArenaConfig::default())
    }
}

// =========================================================================
// Test support
// =========================================================================

/// Helpers shared by the handler test modules.
#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::atomic::{AtomicU64, Ordering};

    use skyfall_protocol::{ClientMessage, PlayerId, ServerMessage};
    use skyfall_transport::ConnectionId;

    use crate::{Arena, OutboundReceiver, outbound_channel};

    static NEXT_CONN: AtomicU64 = AtomicU64::new(1);

    /// One connected test client.
    pub struct Client {
        pub conn: ConnectionId,
        pub id: PlayerId,
        pub rx: OutboundReceiver,
    }

    impl Client {
        /// Everything queued for this client so far.
        pub fn inbox(&mut self) -> Vec<ServerMessage> {
            self.rx.drain()
        }
    }

    pub fn join(arena: &mut Arena) -> Client {
        let conn = ConnectionId::new(NEXT_CONN.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = outbound_channel(arena.config().unreliable_queue_depth);
        let id = arena.connect(conn, tx).expect("connect should succeed");
        Client { conn, id, rx }
    }

    /// Connects and names a client, then clears its inbox.
    pub fn join_named(arena: &mut Arena, name: &str) -> Client {
        let mut client = join(arena);
        arena
            .handle(
                client.conn,
                ClientMessage::SetName { name: name.into() },
            )
            .expect("naming should succeed");
        client.inbox();
        client
    }

    pub fn health(player_id: PlayerId, health: f32) -> ServerMessage {
        ServerMessage::HealthSnapshot {
            player_id,
            health,
            max_health: 100.0,
        }
    }
}
