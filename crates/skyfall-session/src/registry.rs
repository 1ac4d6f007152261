//! The session registry: which connection is which player.
//!
//! Responsibilities:
//! - Allocating a fresh, never-reused [`PlayerId`] per connection
//! - Creating the matching [`PlayerState`] at default values
//! - Resolving an inbound connection to its player
//! - Removing both on disconnect
//!
//! # Concurrency note
//!
//! `SessionRegistry` uses plain `HashMap`s and `&mut self`. It is owned
//! by the arena actor, which processes one command at a time, so every
//! read sees a consistent store and every write has a single writer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use skyfall_protocol::PlayerId;
use skyfall_transport::ConnectionId;

use crate::{PlayerDefaults, PlayerState, PlayerStore, SessionError};

/// Process-wide id counter. Ids are never reused, so a respawn timer
/// holding an old id can never hit a newer player.
static NEXT_PLAYER_ID: AtomicU64 = AtomicU64::new(1);

/// Maps live connections to players and owns the player store.
///
/// ## Lifecycle
///
/// ```text
/// register(conn) ──→ resolve(conn)* ──→ release(player_id)
///       │                                      │
///       ▼                                      ▼
///  [PlayerState created]               [PlayerState removed,
///                                        last name returned]
/// ```
#[derive(Debug)]
pub struct SessionRegistry {
    /// Connection → player. One entry per live session.
    sessions: HashMap<ConnectionId, PlayerId>,

    /// Reverse index so `release` can be called with a player id.
    /// Kept in sync with `sessions`.
    connections: HashMap<PlayerId, ConnectionId>,

    store: PlayerStore,

    defaults: PlayerDefaults,
}

impl SessionRegistry {
    /// Creates an empty registry whose new players start from `defaults`.
    pub fn new(defaults: PlayerDefaults) -> Self {
        Self {
            sessions: HashMap::new(),
            connections: HashMap::new(),
            store: PlayerStore::new(),
            defaults,
        }
    }

    /// Registers a new connection and creates its player record.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyRegistered`] if this connection
    /// already has a player.
    pub fn register(
        &mut self,
        conn: ConnectionId,
    ) -> Result<PlayerId, SessionError> {
        if self.sessions.contains_key(&conn) {
            return Err(SessionError::AlreadyRegistered(conn));
        }

        let player_id =
            PlayerId(NEXT_PLAYER_ID.fetch_add(1, Ordering::Relaxed));

        self.sessions.insert(conn, player_id);
        self.connections.insert(player_id, conn);
        self.store.insert(PlayerState::new(player_id, &self.defaults));

        tracing::info!(%conn, %player_id, "session registered");
        Ok(player_id)
    }

    /// Looks up the player for a live connection.
    pub fn resolve(&self, conn: ConnectionId) -> Option<PlayerId> {
        self.sessions.get(&conn).copied()
    }

    /// Removes the player's session and state.
    ///
    /// Returns the player's name if they had completed naming, so the
    /// caller knows whether (and how) to announce the departure.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if the player is not registered.
    pub fn release(
        &mut self,
        player_id: PlayerId,
    ) -> Result<Option<String>, SessionError> {
        let conn = self
            .connections
            .remove(&player_id)
            .ok_or(SessionError::NotFound(player_id))?;
        self.sessions.remove(&conn);

        let name = self
            .store
            .remove(&player_id)
            .and_then(|state| state.name().map(str::to_owned));

        tracing::info!(%conn, %player_id, "session released");
        Ok(name)
    }

    /// Read access to the player store.
    pub fn store(&self) -> &PlayerStore {
        &self.store
    }

    /// Write access to the player store.
    pub fn store_mut(&mut self) -> &mut PlayerStore {
        &mut self.store
    }

    /// The defaults new players start from and respawns reset to.
    pub fn defaults(&self) -> &PlayerDefaults {
        &self.defaults
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if nobody is connected.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(PlayerDefaults::default())
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Naming convention: `test_{function}_{scenario}_{expected}`.

    use super::*;
    use crate::Presence;

    fn conn(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    // =====================================================================
    // register()
    // =====================================================================

    #[test]
    fn test_register_new_connection_creates_default_state() {
        let mut reg = SessionRegistry::default();

        let pid = reg.register(conn(1)).expect("should register");

        let state = reg.store().get(&pid).expect("state should exist");
        assert_eq!(state.id, pid);
        assert_eq!(state.presence, Presence::Connected);
        assert_eq!(state.health(), 100.0);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_register_uses_configured_defaults() {
        let mut reg = SessionRegistry::new(PlayerDefaults {
            max_health: 250.0,
            ..PlayerDefaults::default()
        });

        let pid = reg.register(conn(1)).unwrap();

        let state = reg.store().get(&pid).unwrap();
        assert_eq!(state.health(), 250.0);
        assert_eq!(state.max_health, 250.0);
    }

    #[test]
    fn test_register_each_connection_gets_unique_id() {
        let mut reg = SessionRegistry::default();

        let a = reg.register(conn(1)).unwrap();
        let b = reg.register(conn(2)).unwrap();

        assert_ne!(a, b);
    }

    #[test]
    fn test_register_same_connection_twice_returns_error() {
        let mut reg = SessionRegistry::default();
        reg.register(conn(1)).unwrap();

        let result = reg.register(conn(1));

        assert!(matches!(
            result,
            Err(SessionError::AlreadyRegistered(c)) if c == conn(1)
        ));
    }

    #[test]
    fn test_register_after_release_never_reuses_id() {
        let mut reg = SessionRegistry::default();
        let first = reg.register(conn(1)).unwrap();
        reg.release(first).unwrap();

        let second = reg.register(conn(1)).unwrap();

        assert_ne!(first, second, "ids must not be recycled");
    }

    // =====================================================================
    // resolve()
    // =====================================================================

    #[test]
    fn test_resolve_live_connection_returns_player() {
        let mut reg = SessionRegistry::default();
        let pid = reg.register(conn(5)).unwrap();

        assert_eq!(reg.resolve(conn(5)), Some(pid));
    }

    #[test]
    fn test_resolve_unknown_connection_returns_none() {
        let reg = SessionRegistry::default();

        assert_eq!(reg.resolve(conn(99)), None);
    }

    // =====================================================================
    // release()
    // =====================================================================

    #[test]
    fn test_release_named_player_returns_name_and_removes_state() {
        let mut reg = SessionRegistry::default();
        let pid = reg.register(conn(1)).unwrap();
        reg.store_mut().get_mut(&pid).unwrap().presence =
            Presence::Active { name: "Rex".into() };

        let name = reg.release(pid).expect("should release");

        assert_eq!(name.as_deref(), Some("Rex"));
        assert!(reg.store().get(&pid).is_none());
        assert_eq!(reg.resolve(conn(1)), None);
        assert!(reg.is_empty());
    }

    #[test]
    fn test_release_unnamed_player_returns_none() {
        let mut reg = SessionRegistry::default();
        let pid = reg.register(conn(1)).unwrap();

        let name = reg.release(pid).expect("should release");

        assert_eq!(name, None);
        assert!(reg.store().is_empty());
    }

    #[test]
    fn test_release_twice_returns_not_found() {
        let mut reg = SessionRegistry::default();
        let pid = reg.register(conn(1)).unwrap();
        reg.release(pid).unwrap();

        let result = reg.release(pid);

        assert!(matches!(result, Err(SessionError::NotFound(p)) if p == pid));
    }

    #[test]
    fn test_release_leaves_other_players_untouched() {
        let mut reg = SessionRegistry::default();
        let rex = reg.register(conn(1)).unwrap();
        let ivy = reg.register(conn(2)).unwrap();

        reg.release(rex).unwrap();

        assert_eq!(reg.resolve(conn(2)), Some(ivy));
        assert!(reg.store().contains(&ivy));
        assert_eq!(reg.len(), 1);
    }
}
