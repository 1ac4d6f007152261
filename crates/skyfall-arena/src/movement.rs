//! Movement and projectile relay.
//!
//! Position broadcasts travel on the unreliable channel: a newer update
//! supersedes an older one, so dropping under load is fine.

use skyfall_protocol::{PlayerId, Projectile, ServerMessage, Transform};

use crate::{Arena, Rejection};

impl Arena {
    /// Stores the sender's transform and relays it to everyone else.
    ///
    /// The store is always updated, even before naming, so the player's
    /// first roster entry is accurate. Only named players are relayed.
    pub fn update_transform(&mut self, player_id: PlayerId, transform: Transform) {
        let Some(player) = self.registry.store_mut().get_mut(&player_id) else {
            return;
        };
        player.transform = transform;

        if player.is_active() {
            self.broadcaster.to_all_except(
                player_id,
                ServerMessage::PositionBroadcast {
                    player_id,
                    transform,
                },
            );
        }
    }

    /// Relays a projectile to everyone except the shooter.
    pub fn fire_projectile(
        &mut self,
        shooter_id: PlayerId,
        projectile: Projectile,
    ) -> Result<(), Rejection> {
        self.active_name(shooter_id)?;
        self.broadcaster.to_all_except(
            shooter_id,
            ServerMessage::ProjectileBroadcast {
                shooter_id,
                projectile,
            },
        );
        Ok(())
    }
}
