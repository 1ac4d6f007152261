//! Player state: the server's authoritative record of one player.
//!
//! A `PlayerState` tracks:
//! - WHO the player is (`PlayerId`, and a name once they pick one)
//! - WHERE they are (`Transform`)
//! - HOW they are doing (`health`, `max_health`, `Vitals`)

use std::collections::HashMap;

use skyfall_protocol::{PlayerId, PlayerSnapshot, Transform};

/// Display name used in logs for players who have not named themselves.
pub const UNNAMED: &str = "unnamed";

// ---------------------------------------------------------------------------
// PlayerDefaults
// ---------------------------------------------------------------------------

/// Values a fresh player record starts with, and what a respawn resets to.
#[derive(Debug, Clone)]
pub struct PlayerDefaults {
    /// Starting and maximum health. Default: 100.
    pub max_health: f32,

    /// Canonical spawn point. Default: origin, no rotation, scale 1.
    pub spawn: Transform,
}

impl Default for PlayerDefaults {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            spawn: Transform::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Presence
// ---------------------------------------------------------------------------

/// Whether the player is visible to others.
///
/// ```text
///   Connected ──(first set-name)──→ Active { name }
///                                      │   ↑
///                                      └───┘ (rename)
/// ```
///
/// - **Connected**: the socket is up and an id is assigned, but the player
///   has not named themselves. They receive the roster and nothing else,
///   and nobody else hears about them.
/// - **Active**: named and visible. Joins, moves, and combat are broadcast.
///
/// There is no way back from `Active` to `Connected`; a player stops being
/// visible only by disconnecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    Connected,
    Active { name: String },
}

// ---------------------------------------------------------------------------
// Vitals
// ---------------------------------------------------------------------------

/// The combat state machine for one player.
///
/// ```text
///   Alive ──(kill accepted)──→ Dying ──(timer armed)──→ RespawnScheduled
///     ↑                                                       │
///     └───────────────────(respawn fires)─────────────────────┘
/// ```
///
/// `Dying` and `RespawnScheduled` together are "death pending": while in
/// either, damage and kill claims against the player are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Vitals {
    #[default]
    Alive,
    Dying,
    RespawnScheduled,
}

// ---------------------------------------------------------------------------
// PlayerState
// ---------------------------------------------------------------------------

/// The authoritative record for one connected player.
#[derive(Debug, Clone)]
pub struct PlayerState {
    /// Assigned at registration, never changes.
    pub id: PlayerId,

    pub presence: Presence,

    /// Last transform the client reported, or the spawn point.
    pub transform: Transform,

    /// Always within `0.0..=max_health`; see [`set_health`](Self::set_health).
    health: f32,

    pub max_health: f32,

    pub vitals: Vitals,
}

impl PlayerState {
    /// A fresh, anonymous, full-health player at the spawn point.
    pub fn new(id: PlayerId, defaults: &PlayerDefaults) -> Self {
        Self {
            id,
            presence: Presence::Connected,
            transform: defaults.spawn,
            health: defaults.max_health,
            max_health: defaults.max_health,
            vitals: Vitals::Alive,
        }
    }

    /// The player's chosen name, or `None` before naming.
    pub fn name(&self) -> Option<&str> {
        match &self.presence {
            Presence::Connected => None,
            Presence::Active { name } => Some(name),
        }
    }

    /// The name to show in logs: the chosen name or [`UNNAMED`].
    pub fn display_name(&self) -> &str {
        self.name().unwrap_or(UNNAMED)
    }

    /// Returns `true` once the player has completed naming.
    pub fn is_active(&self) -> bool {
        matches!(self.presence, Presence::Active { .. })
    }

    /// Returns `true` between an accepted kill and the respawn.
    pub fn death_pending(&self) -> bool {
        !matches!(self.vitals, Vitals::Alive)
    }

    pub fn health(&self) -> f32 {
        self.health
    }

    /// Sets health, clamped into `0.0..=max_health`.
    ///
    /// Non-finite values (NaN from a broken client) are treated as 0.
    pub fn set_health(&mut self, health: f32) {
        self.health = if health.is_finite() {
            health.clamp(0.0, self.max_health)
        } else {
            0.0
        };
    }

    /// Full public state, or `None` for anonymous players.
    pub fn snapshot(&self) -> Option<PlayerSnapshot> {
        let name = self.name()?;
        Some(PlayerSnapshot {
            id: self.id,
            name: name.to_owned(),
            transform: self.transform,
            health: self.health,
            max_health: self.max_health,
        })
    }
}

// ---------------------------------------------------------------------------
// PlayerStore
// ---------------------------------------------------------------------------

/// Map from player id to authoritative state.
///
/// Plain data with no locking. Whoever owns the store is its single writer.
#[derive(Debug, Default)]
pub struct PlayerStore {
    players: HashMap<PlayerId, PlayerState>,
}

impl PlayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, state: PlayerState) {
        self.players.insert(state.id, state);
    }

    pub fn remove(&mut self, id: &PlayerId) -> Option<PlayerState> {
        self.players.remove(id)
    }

    pub fn get(&self, id: &PlayerId) -> Option<&PlayerState> {
        self.players.get(id)
    }

    pub fn get_mut(&mut self, id: &PlayerId) -> Option<&mut PlayerState> {
        self.players.get_mut(id)
    }

    pub fn contains(&self, id: &PlayerId) -> bool {
        self.players.contains_key(id)
    }

    /// Snapshots of every named player, ordered by id so rosters are
    /// stable.
    pub fn active_snapshots(&self) -> Vec<PlayerSnapshot> {
        let mut snapshots: Vec<PlayerSnapshot> =
            self.players.values().filter_map(PlayerState::snapshot).collect();
        snapshots.sort_by_key(|s| s.id);
        snapshots
    }

    /// Number of players, named or not.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
