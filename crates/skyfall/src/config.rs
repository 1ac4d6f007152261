//! Server configuration with environment overrides.
//!
//! | Variable                         | Field                 |
//! |----------------------------------|-----------------------|
//! | `SKYFALL_BIND`                   | `bind_addr`           |
//! | `SKYFALL_IDLE_TIMEOUT_SECS`      | `idle_timeout`        |
//! | `SKYFALL_HANDSHAKE_TIMEOUT_SECS` | `handshake_timeout`   |
//! | `SKYFALL_RESPAWN_DELAY_MS`       | `arena.respawn_delay` |
//! | `SKYFALL_MAX_HEALTH`             | `arena.max_health`    |

use std::env;
use std::str::FromStr;
use std::time::Duration;

use skyfall_arena::ArenaConfig;

use crate::SkyfallError;

/// Everything needed to start a server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,

    /// A connection that sends nothing for this long is closed.
    pub idle_timeout: Duration,

    /// A peer that has not finished the WebSocket upgrade by then is
    /// dropped.
    pub handshake_timeout: Duration,

    pub arena: ArenaConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            idle_timeout: Duration::from_secs(15),
            handshake_timeout: Duration::from_secs(5),
            arena: ArenaConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Defaults, overridden by any `SKYFALL_*` variables that are set.
    ///
    /// # Errors
    /// [`SkyfallError::Config`] if a variable is set but does not parse.
    pub fn from_env() -> Result<Self, SkyfallError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through
    /// `lookup`.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SkyfallError> {
        let mut config = Self::default();

        if let Some(addr) = lookup("SKYFALL_BIND") {
            config.bind_addr = addr;
        }
        if let Some(secs) = parse::<u64>(&lookup, "SKYFALL_IDLE_TIMEOUT_SECS")? {
            config.idle_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse::<u64>(&lookup, "SKYFALL_HANDSHAKE_TIMEOUT_SECS")? {
            config.handshake_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = parse::<u64>(&lookup, "SKYFALL_RESPAWN_DELAY_MS")? {
            config.arena.respawn_delay = Duration::from_millis(ms);
        }
        if let Some(health) = parse::<f32>(&lookup, "SKYFALL_MAX_HEALTH")? {
            if !(health.is_finite() && health > 0.0) {
                return Err(SkyfallError::Config(format!(
                    "SKYFALL_MAX_HEALTH must be positive, got {health}"
                )));
            }
            config.arena.max_health = health;
        }

        Ok(config)
    }
}

fn parse<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, SkyfallError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|e| SkyfallError::Config(format!("{key}={raw:?}: {e}")))
}
