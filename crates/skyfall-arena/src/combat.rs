//! Combat resolution: damage, kills, and respawns.
//!
//! Per-player state machine (see [`Vitals`]):
//!
//! ```text
//!   Alive ──kill accepted──→ Dying ──timer armed──→ RespawnScheduled
//!     ↑                                                   │
//!     └──────────────────────respawn──────────────────────┘
//! ```
//!
//! Clients report the health their damage produced and the server adopts
//! it. State transitions are gated on server-held values instead: a kill
//! needs stored health at zero and no death already pending, which turns
//! duplicate or early kill claims into silent drops.

use skyfall_protocol::{PlayerId, ServerMessage};
use skyfall_session::{PlayerState, Vitals};

use crate::{Arena, Rejection, RespawnTicket};

impl Arena {
    /// Applies a client-reported hit.
    ///
    /// On success the target alone receives `DamageDelivered` (with the
    /// source's name) and everyone receives the target's new
    /// `HealthSnapshot`.
    ///
    /// # Errors
    /// - [`Rejection::SenderNotActive`]: the source has not named itself
    /// - [`Rejection::UnknownTarget`]: no such named player
    /// - [`Rejection::TargetDying`]: the target's death is already pending
    pub fn apply_damage(
        &mut self,
        source_id: PlayerId,
        target_id: PlayerId,
        damage: f32,
        reported_health: f32,
    ) -> Result<(), Rejection> {
        let source_name = self.active_name(source_id)?;
        let target = self.live_target(target_id)?;

        target.set_health(reported_health);
        let resulting_health = target.health();
        let max_health = target.max_health;

        tracing::debug!(
            %source_id, %target_id, damage, resulting_health,
            "damage applied"
        );

        self.broadcaster.to_player(
            target_id,
            ServerMessage::DamageDelivered {
                source_id,
                source_name,
                target_id,
                damage,
                resulting_health,
            },
        );
        self.broadcaster.to_all(ServerMessage::HealthSnapshot {
            player_id: target_id,
            health: resulting_health,
            max_health,
        });
        Ok(())
    }

    /// Accepts or rejects a kill claim.
    ///
    /// An accepted claim marks the target `Dying`, pins its health at 0,
    /// broadcasts `KillAnnounced` once, and returns the respawn the
    /// caller must schedule. The announcement uses the server's copy of
    /// the target's name; `claimed_name` is only compared for logging.
    ///
    /// # Errors
    /// - [`Rejection::SenderNotActive`]: the killer has not named itself
    /// - [`Rejection::UnknownTarget`]: no such named player
    /// - [`Rejection::TargetDying`]: this death was already accepted
    /// - [`Rejection::TargetStillAlive`]: stored health is above zero
    pub fn apply_kill(
        &mut self,
        killer_id: PlayerId,
        target_id: PlayerId,
        claimed_name: &str,
    ) -> Result<RespawnTicket, Rejection> {
        let killer_name = self.active_name(killer_id)?;
        let target = self.live_target(target_id)?;

        if target.health() > 0.0 {
            return Err(Rejection::TargetStillAlive(target_id));
        }

        target.vitals = Vitals::Dying;
        target.set_health(0.0);
        let target_name = target.display_name().to_owned();

        if target_name != claimed_name {
            tracing::debug!(
                %target_id, claimed = claimed_name, actual = %target_name,
                "kill claim named the wrong target"
            );
        }
        tracing::info!(%killer_id, %target_id, "kill accepted");

        self.broadcaster.to_all(ServerMessage::KillAnnounced {
            killer_id,
            killer_name,
            target_id,
            target_name,
        });

        Ok(RespawnTicket {
            player_id: target_id,
            delay: self.config.respawn_delay,
        })
    }

    /// Records that the respawn timer for `player_id` is running.
    pub fn mark_respawn_scheduled(&mut self, player_id: PlayerId) {
        if let Some(player) = self.registry.store_mut().get_mut(&player_id) {
            if player.vitals == Vitals::Dying {
                player.vitals = Vitals::RespawnScheduled;
            }
        }
    }

    /// Brings a dead player back.
    ///
    /// Resets health to max and the transform to the spawn point, clears
    /// the pending death, sends `Respawned` to the player and a
    /// `HealthSnapshot` to everyone. A player who disconnected in the
    /// meantime is skipped without sending anything.
    ///
    /// Returns `true` if the respawn happened.
    pub fn respawn(&mut self, player_id: PlayerId) -> bool {
        let spawn = self.registry.defaults().spawn;
        let Some(player) = self.registry.store_mut().get_mut(&player_id) else {
            tracing::debug!(%player_id, "respawn target gone, skipping");
            return false;
        };
        if !player.death_pending() {
            tracing::debug!(%player_id, "no death pending, skipping respawn");
            return false;
        }

        player.set_health(player.max_health);
        player.transform = spawn;
        player.vitals = Vitals::Alive;
        let health = player.health();
        let max_health = player.max_health;

        tracing::info!(%player_id, "player respawned");

        self.broadcaster.to_player(
            player_id,
            ServerMessage::Respawned {
                health,
                max_health,
                transform: spawn,
            },
        );
        self.broadcaster.to_all(ServerMessage::HealthSnapshot {
            player_id,
            health,
            max_health,
        });
        true
    }

    /// A named, alive target, or the reason it cannot be hit.
    ///
    /// Anonymous players count as unknown: nobody else can see them.
    fn live_target(
        &mut self,
        target_id: PlayerId,
    ) -> Result<&mut PlayerState, Rejection> {
        let target = self
            .registry
            .store_mut()
            .get_mut(&target_id)
            .filter(|p| p.is_active())
            .ok_or(Rejection::UnknownTarget(target_id))?;
        if target.death_pending() {
            return Err(Rejection::TargetDying(target_id));
        }
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    //! Naming convention: `test_{function}_{scenario}_{expected}`.

    use skyfall_protocol::{ClientMessage, ServerMessage, Transform, Vec3};
    use skyfall_session::Vitals;

    use crate::arena::test_support::*;
    use crate::{Arena, ArenaConfig, Rejection};

    fn damage(arena: &mut Arena, from: &Client, to: &Client, dmg: f32, left: f32) -> Result<(), Rejection> {
        arena
            .handle(
                from.conn,
                ClientMessage::DamageReport {
                    target_id: to.id,
                    damage: dmg,
                    resulting_health: left,
                },
            )
            .map(|_| ())
    }

    fn kill(arena: &mut Arena, from: &Client, to: &Client, name: &str) -> Result<Option<crate::RespawnTicket>, Rejection> {
        arena.handle(
            from.conn,
            ClientMessage::KillClaim {
                target_id: to.id,
                target_name: name.into(),
            },
        )
    }

    fn kill_count(inbox: &[ServerMessage]) -> usize {
        inbox
            .iter()
            .filter(|m| matches!(m, ServerMessage::KillAnnounced { .. }))
            .count()
    }

    /// Rex and Ivy, both named, inboxes cleared.
    fn duel() -> (Arena, Client, Client) {
        let mut arena = Arena::default();
        let mut rex = join_named(&mut arena, "Rex");
        let mut ivy = join_named(&mut arena, "Ivy");
        rex.inbox();
        ivy.inbox();
        (arena, rex, ivy)
    }

    // =====================================================================
    // apply_damage()
    // =====================================================================

    #[test]
    fn test_apply_damage_notifies_target_and_broadcasts_health() {
        let (mut arena, mut rex, mut ivy) = duel();

        damage(&mut arena, &rex, &ivy, 30.0, 70.0).unwrap();

        assert_eq!(
            ivy.inbox(),
            vec![
                ServerMessage::DamageDelivered {
                    source_id: rex.id,
                    source_name: "Rex".into(),
                    target_id: ivy.id,
                    damage: 30.0,
                    resulting_health: 70.0,
                },
                health(ivy.id, 70.0),
            ]
        );
        assert_eq!(rex.inbox(), vec![health(ivy.id, 70.0)]);
    }

    #[test]
    fn test_apply_damage_reported_health_is_clamped() {
        let (mut arena, rex, mut ivy) = duel();

        damage(&mut arena, &rex, &ivy, 500.0, -400.0).unwrap();

        let inbox = ivy.inbox();
        assert_eq!(inbox[1], health(ivy.id, 0.0));
        assert_eq!(arena.registry().store().get(&ivy.id).unwrap().health(), 0.0);
    }

    #[test]
    fn test_apply_damage_unnamed_source_is_rejected() {
        let (mut arena, _rex, mut ivy) = duel();
        let lurker = join(&mut arena);

        let result = damage(&mut arena, &lurker, &ivy, 10.0, 90.0);

        assert_eq!(result, Err(Rejection::SenderNotActive(lurker.id)));
        assert!(ivy.inbox().is_empty());
    }

    #[test]
    fn test_apply_damage_unnamed_target_is_unknown() {
        let (mut arena, rex, _ivy) = duel();
        let lurker = join(&mut arena);

        let result = damage(&mut arena, &rex, &lurker, 10.0, 90.0);

        assert_eq!(result, Err(Rejection::UnknownTarget(lurker.id)));
    }

    #[test]
    fn test_apply_damage_disconnected_target_is_unknown() {
        let (mut arena, rex, ivy) = duel();
        arena.disconnect(ivy.conn);

        let result = damage(&mut arena, &rex, &ivy, 10.0, 90.0);

        assert_eq!(result, Err(Rejection::UnknownTarget(ivy.id)));
    }

    #[test]
    fn test_apply_damage_dying_target_is_rejected() {
        let (mut arena, mut rex, ivy) = duel();
        damage(&mut arena, &rex, &ivy, 100.0, 0.0).unwrap();
        kill(&mut arena, &rex, &ivy, "Ivy").unwrap();
        rex.inbox();

        let result = damage(&mut arena, &rex, &ivy, 10.0, 50.0);

        assert_eq!(result, Err(Rejection::TargetDying(ivy.id)));
        assert!(rex.inbox().is_empty());
        assert_eq!(arena.registry().store().get(&ivy.id).unwrap().health(), 0.0);
    }

    // =====================================================================
    // apply_kill()
    // =====================================================================

    #[test]
    fn test_apply_kill_at_zero_health_announces_once() {
        let (mut arena, mut rex, mut ivy) = duel();
        damage(&mut arena, &rex, &ivy, 100.0, 0.0).unwrap();

        let ticket = kill(&mut arena, &rex, &ivy, "Ivy")
            .unwrap()
            .expect("kill should schedule a respawn");
        let second = kill(&mut arena, &rex, &ivy, "Ivy");

        assert_eq!(ticket.player_id, ivy.id);
        assert_eq!(ticket.delay, arena.config().respawn_delay);
        assert_eq!(second, Err(Rejection::TargetDying(ivy.id)));

        let seen = rex.inbox();
        assert_eq!(kill_count(&seen), 1);
        assert!(seen.contains(&ServerMessage::KillAnnounced {
            killer_id: rex.id,
            killer_name: "Rex".into(),
            target_id: ivy.id,
            target_name: "Ivy".into(),
        }));
        assert_eq!(kill_count(&ivy.inbox()), 1);
        assert_eq!(
            arena.registry().store().get(&ivy.id).unwrap().vitals,
            Vitals::Dying
        );
    }

    #[test]
    fn test_apply_kill_target_with_health_is_rejected() {
        let (mut arena, mut rex, ivy) = duel();
        damage(&mut arena, &rex, &ivy, 30.0, 70.0).unwrap();
        rex.inbox();

        let result = kill(&mut arena, &rex, &ivy, "Ivy");

        assert_eq!(result, Err(Rejection::TargetStillAlive(ivy.id)));
        assert_eq!(kill_count(&rex.inbox()), 0);
    }

    #[test]
    fn test_apply_kill_unnamed_killer_is_rejected() {
        let (mut arena, rex, ivy) = duel();
        damage(&mut arena, &rex, &ivy, 100.0, 0.0).unwrap();
        let lurker = join(&mut arena);

        let result = kill(&mut arena, &lurker, &ivy, "Ivy");

        assert_eq!(result, Err(Rejection::SenderNotActive(lurker.id)));
    }

    #[test]
    fn test_apply_kill_uses_server_name_for_target() {
        let (mut arena, mut rex, ivy) = duel();
        damage(&mut arena, &rex, &ivy, 100.0, 0.0).unwrap();
        rex.inbox();

        kill(&mut arena, &rex, &ivy, "Somebody Else").unwrap();

        let announced = rex
            .inbox()
            .into_iter()
            .find_map(|m| match m {
                ServerMessage::KillAnnounced { target_name, .. } => Some(target_name),
                _ => None,
            });
        assert_eq!(announced.as_deref(), Some("Ivy"));
    }

    // =====================================================================
    // respawn()
    // =====================================================================

    #[test]
    fn test_respawn_resets_and_notifies() {
        let spawn = Transform::at(Vec3::new(0.0, 50.0, 0.0));
        let mut arena = Arena::new(ArenaConfig {
            spawn,
            ..ArenaConfig::default()
        });
        let mut rex = join_named(&mut arena, "Rex");
        let mut ivy = join_named(&mut arena, "Ivy");
        arena.update_transform(ivy.id, Transform::at(Vec3::new(9.0, 9.0, 9.0)));
        damage(&mut arena, &rex, &ivy, 100.0, 0.0).unwrap();
        let ticket = kill(&mut arena, &rex, &ivy, "Ivy").unwrap().unwrap();
        arena.mark_respawn_scheduled(ticket.player_id);
        rex.inbox();
        ivy.inbox();

        assert!(arena.respawn(ticket.player_id));

        assert_eq!(
            ivy.inbox(),
            vec![
                ServerMessage::Respawned {
                    health: 100.0,
                    max_health: 100.0,
                    transform: spawn,
                },
                health(ivy.id, 100.0),
            ]
        );
        assert_eq!(rex.inbox(), vec![health(ivy.id, 100.0)]);

        let state = arena.registry().store().get(&ivy.id).unwrap();
        assert_eq!(state.vitals, Vitals::Alive);
        assert_eq!(state.transform, spawn);
    }

    #[test]
    fn test_respawn_after_disconnect_is_silent_noop() {
        let (mut arena, mut rex, ivy) = duel();
        damage(&mut arena, &rex, &ivy, 100.0, 0.0).unwrap();
        let ticket = kill(&mut arena, &rex, &ivy, "Ivy").unwrap().unwrap();
        arena.disconnect(ivy.conn);
        rex.inbox();

        assert!(!arena.respawn(ticket.player_id));

        assert!(rex.inbox().is_empty());
        assert!(!arena.registry().store().contains(&ivy.id));
    }

    #[test]
    fn test_respawn_without_pending_death_does_nothing() {
        let (mut arena, mut rex, ivy) = duel();

        assert!(!arena.respawn(ivy.id));
        assert!(rex.inbox().is_empty());
    }

    #[test]
    fn test_respawn_allows_a_new_kill_cycle() {
        let (mut arena, mut rex, ivy) = duel();
        damage(&mut arena, &rex, &ivy, 100.0, 0.0).unwrap();
        kill(&mut arena, &rex, &ivy, "Ivy").unwrap();
        arena.respawn(ivy.id);

        damage(&mut arena, &rex, &ivy, 100.0, 0.0).unwrap();
        let again = kill(&mut arena, &rex, &ivy, "Ivy");

        assert!(matches!(again, Ok(Some(_))));
        assert_eq!(kill_count(&rex.inbox()), 2);
    }

    #[test]
    fn test_mark_respawn_scheduled_only_from_dying() {
        let (mut arena, rex, ivy) = duel();

        arena.mark_respawn_scheduled(ivy.id);
        assert_eq!(
            arena.registry().store().get(&ivy.id).unwrap().vitals,
            Vitals::Alive
        );

        damage(&mut arena, &rex, &ivy, 100.0, 0.0).unwrap();
        kill(&mut arena, &rex, &ivy, "Ivy").unwrap();
        arena.mark_respawn_scheduled(ivy.id);
        assert_eq!(
            arena.registry().store().get(&ivy.id).unwrap().vitals,
            Vitals::RespawnScheduled
        );
    }
}
