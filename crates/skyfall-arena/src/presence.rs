//! The naming handshake: how an anonymous connection becomes a visible
//! player.

use skyfall_protocol::{PlayerId, ServerMessage};
use skyfall_session::Presence;

use crate::{Arena, Rejection};

impl Arena {
    /// Sets a player's display name.
    ///
    /// The first call moves the player from `Connected` to `Active` and
    /// broadcasts `PlayerJoined` plus a `HealthSnapshot` to everyone. This
    /// is the only place a player becomes visible. Later calls broadcast
    /// `NameChanged` only.
    ///
    /// Names are trimmed and cut to `max_name_len` characters.
    pub fn set_name(
        &mut self,
        player_id: PlayerId,
        name: &str,
    ) -> Result<(), Rejection> {
        let name: String = name.trim().chars().take(self.config.max_name_len).collect();
        if name.is_empty() {
            return Err(Rejection::EmptyName);
        }

        let player = self
            .registry
            .store_mut()
            .get_mut(&player_id)
            .ok_or(Rejection::SenderNotActive(player_id))?;

        let first = !player.is_active();
        player.presence = Presence::Active { name: name.clone() };

        if first {
            tracing::info!(%player_id, %name, "player joined");
            if let Some(snapshot) = player.snapshot() {
                self.broadcaster
                    .to_all(ServerMessage::PlayerJoined { player: snapshot });
            }
            if let Some(health) = self.health_snapshot(player_id) {
                self.broadcaster.to_all(health);
            }
        } else {
            tracing::info!(%player_id, %name, "player renamed");
            self.broadcaster
                .to_all(ServerMessage::NameChanged { player_id, name });
        }

        Ok(())
    }
}
