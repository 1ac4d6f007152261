//! Arena configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use skyfall_protocol::Transform;
use skyfall_session::PlayerDefaults;

/// Settings for one arena.
///
/// Everything has a working default; override individual fields with
/// struct update syntax:
///
/// ```rust
/// use std::time::Duration;
/// use skyfall_arena::ArenaConfig;
///
/// let config = ArenaConfig {
///     respawn_delay: Duration::from_millis(500),
///     ..ArenaConfig::default()
/// };
/// assert_eq!(config.max_health, 100.0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArenaConfig {
    /// Starting and maximum health for every player.
    pub max_health: f32,

    /// Where players start and respawn.
    pub spawn: Transform,

    /// Time between an accepted kill and the respawn.
    pub respawn_delay: Duration,

    /// Most unreliable (position) messages a session may have waiting in
    /// its outbound queue. Past that, new position updates for that
    /// client are dropped.
    pub unreliable_queue_depth: usize,

    /// Capacity of the arena's command channel.
    pub command_channel_size: usize,

    /// Display names are truncated to this many characters.
    pub max_name_len: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            spawn: Transform::default(),
            respawn_delay: Duration::from_secs(3),
            unreliable_queue_depth: 32,
            command_channel_size: 256,
            max_name_len: 32,
        }
    }
}

impl ArenaConfig {
    /// The values new player records start from.
    pub fn player_defaults(&self) -> PlayerDefaults {
        PlayerDefaults {
            max_health: self.max_health,
            spawn: self.spawn,
        }
    }
}
