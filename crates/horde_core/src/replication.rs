//! State replication boundary.
//!
//! The authority is the only writer of game state. After each
//! mutation it describes what changed as a [`ReplicationEvent`] and
//! hands it to every registered [`StateObserver`]. Delivery is
//! fire-and-forget: observers must not block, and an observer that
//! drops events simply shows stale state until the next change or a
//! fresh snapshot.
//!
//! In the other direction observers send [`ObserverCommand`]s, which
//! the transport delivers reliably and in order.

use serde::{Deserialize, Serialize};

use crate::components::EntityId;
use crate::math::{fixed_serde, Fixed, Vec3Fixed};

/// A state change published by the authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplicationEvent {
    /// Health changed.
    HealthChanged {
        /// Affected entity.
        entity: EntityId,
        /// Health before the change.
        old: u32,
        /// Health after the change.
        new: u32,
    },
    /// Position or facing changed.
    Transform {
        /// Affected entity.
        entity: EntityId,
        /// New position.
        position: Vec3Fixed,
        /// New facing.
        facing: Vec3Fixed,
    },
    /// Visual hit cue.
    DamageFlash {
        /// Entity that was hit.
        entity: EntityId,
    },
    /// Terminal death notice, sent once per entity.
    Died {
        /// Entity that died.
        entity: EntityId,
        /// Entity credited with the kill, if any.
        killer: Option<EntityId>,
    },
    /// Enemy entered the world.
    EnemySpawned {
        /// New enemy.
        entity: EntityId,
        /// Archetype name.
        archetype: String,
        /// Spawn position.
        position: Vec3Fixed,
        /// Scaled max health.
        max_health: u32,
    },
    /// Enemy left the world.
    EnemyRemoved {
        /// Removed enemy.
        entity: EntityId,
    },
    /// Projectile fired.
    ProjectileSpawned {
        /// New projectile.
        entity: EntityId,
        /// Shooter.
        source: EntityId,
        /// Launch position.
        position: Vec3Fixed,
        /// Velocity in units per second.
        velocity: Vec3Fixed,
    },
    /// Projectile hit something or expired.
    ProjectileRemoved {
        /// Removed projectile.
        entity: EntityId,
    },
    /// Bomber detonated.
    Explosion {
        /// Bomber that exploded.
        entity: EntityId,
        /// Blast center.
        position: Vec3Fixed,
        /// Blast radius.
        #[serde(with = "fixed_serde")]
        radius: Fixed,
    },
    /// Cosmetic enemy hop.
    Hop {
        /// Hopping enemy.
        entity: EntityId,
        /// Peak height.
        #[serde(with = "fixed_serde")]
        height: Fixed,
        /// Seconds in the air.
        #[serde(with = "fixed_serde")]
        duration: Fixed,
    },
    /// A wave began spawning.
    WaveStarted {
        /// Zero-based wave index.
        index: u32,
        /// Wave name.
        name: String,
        /// Enemies the wave will spawn.
        total: u32,
    },
    /// A wave finished spawning and its tail interval elapsed.
    WaveCompleted {
        /// Zero-based wave index.
        index: u32,
    },
    /// A wave stopped early because every player was down.
    WaveAborted {
        /// Zero-based wave index.
        index: u32,
        /// Enemies spawned before the abort.
        spawned: u32,
    },
    /// The match is over; observers return to the lobby.
    MatchEnded {
        /// Final tallies.
        summary: MatchSummary,
    },
}

/// Kills credited to one player.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerKills {
    /// Player entity.
    pub player: EntityId,
    /// Display name.
    pub name: String,
    /// Enemies killed.
    pub kills: u32,
}

/// Per-match tallies produced at end of match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MatchSummary {
    /// Number of waves that started (1 = died in the first wave).
    pub wave_reached: u32,
    /// Kill counts in roster order.
    pub kills: Vec<PlayerKills>,
    /// Ticks elapsed when the match ended.
    pub ticks: u64,
}

/// Intent sent by an observer to the authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObserverCommand {
    /// Set the movement direction (ground plane; zero to stop).
    Move {
        /// Issuing player.
        player: EntityId,
        /// Desired direction; clamped to unit length.
        direction: Vec3Fixed,
    },
    /// Request a jump.
    Jump {
        /// Issuing player.
        player: EntityId,
    },
    /// Fire at a position.
    Attack {
        /// Issuing player.
        player: EntityId,
        /// Aim point.
        target_position: Vec3Fixed,
    },
    /// Player disconnected.
    Leave {
        /// Departing player.
        player: EntityId,
    },
}

impl ObserverCommand {
    /// Player that issued the command.
    #[must_use]
    pub const fn player(&self) -> EntityId {
        match self {
            Self::Move { player, .. }
            | Self::Jump { player }
            | Self::Attack { player, .. }
            | Self::Leave { player } => *player,
        }
    }
}

/// Receives authority state changes.
///
/// Implementations must return quickly; the authority calls them from
/// inside its tick. Override [`observe`](Self::observe) to see every
/// event, or only the per-change hooks it dispatches to.
pub trait StateObserver: Send {
    /// Called once per event, in the order mutations happened.
    fn observe(&mut self, tick: u64, event: &ReplicationEvent) {
        match event {
            ReplicationEvent::HealthChanged { entity, old, new } => {
                self.on_health_changed(*entity, *old, *new);
            }
            ReplicationEvent::Transform {
                entity,
                position,
                facing,
            } => self.on_transform(*entity, *position, *facing),
            ReplicationEvent::DamageFlash { entity } => self.on_damage_flash(*entity),
            ReplicationEvent::Died { entity, killer } => self.on_died(*entity, *killer),
            _ => self.on_other(tick, event),
        }
    }

    /// Health of `entity` went from `old` to `new`.
    fn on_health_changed(&mut self, _entity: EntityId, _old: u32, _new: u32) {}

    /// `entity` moved or turned.
    fn on_transform(&mut self, _entity: EntityId, _position: Vec3Fixed, _facing: Vec3Fixed) {}

    /// `entity` took damage.
    fn on_damage_flash(&mut self, _entity: EntityId) {}

    /// `entity` died. Sent once per entity.
    fn on_died(&mut self, _entity: EntityId, _killer: Option<EntityId>) {}

    /// Any event without a dedicated hook.
    fn on_other(&mut self, _tick: u64, _event: &ReplicationEvent) {}
}

/// Fans events out to every registered observer.
#[derive(Default)]
pub struct ReplicationHub {
    observers: Vec<Box<dyn StateObserver>>,
}

impl std::fmt::Debug for ReplicationHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicationHub")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl ReplicationHub {
    /// Create a hub with no observers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer.
    pub fn subscribe(&mut self, observer: Box<dyn StateObserver>) {
        self.observers.push(observer);
    }

    /// Number of registered observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Deliver a batch of events to every observer.
    pub fn publish(&mut self, tick: u64, events: &[ReplicationEvent]) {
        for observer in &mut self.observers {
            for event in events {
                observer.observe(tick, event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Collect(Arc<Mutex<Vec<(u64, ReplicationEvent)>>>);

    impl StateObserver for Collect {
        fn observe(&mut self, tick: u64, event: &ReplicationEvent) {
            if let Ok(mut seen) = self.0.lock() {
                seen.push((tick, event.clone()));
            }
        }
    }

    #[test]
    fn test_hub_delivers_to_all_observers_in_order() {
        let a = Arc::new(Mutex::new(Vec::new()));
        let b = Arc::new(Mutex::new(Vec::new()));
        let mut hub = ReplicationHub::new();
        hub.subscribe(Box::new(Collect(Arc::clone(&a))));
        hub.subscribe(Box::new(Collect(Arc::clone(&b))));

        let events = vec![
            ReplicationEvent::DamageFlash { entity: 1 },
            ReplicationEvent::Died {
                entity: 1,
                killer: Some(2),
            },
        ];
        hub.publish(4, &events);

        for seen in [a, b] {
            let seen = seen.lock().unwrap();
            assert_eq!(seen.len(), 2);
            assert_eq!(seen[0], (4, events[0].clone()));
            assert_eq!(seen[1], (4, events[1].clone()));
        }
    }

    #[derive(Default)]
    struct HealthLog(Arc<Mutex<Vec<(EntityId, u32, u32)>>>);

    impl StateObserver for HealthLog {
        fn on_health_changed(&mut self, entity: EntityId, old: u32, new: u32) {
            if let Ok(mut log) = self.0.lock() {
                log.push((entity, old, new));
            }
        }
    }

    #[test]
    fn test_hooks_receive_their_events() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut hub = ReplicationHub::new();
        hub.subscribe(Box::new(HealthLog(Arc::clone(&log))));
        hub.publish(
            1,
            &[
                ReplicationEvent::DamageFlash { entity: 5 },
                ReplicationEvent::HealthChanged {
                    entity: 5,
                    old: 4,
                    new: 3,
                },
            ],
        );
        assert_eq!(*log.lock().unwrap(), vec![(5, 4, 3)]);
    }

    #[test]
    fn test_command_player() {
        let cmd = ObserverCommand::Attack {
            player: 9,
            target_position: Vec3Fixed::ZERO,
        };
        assert_eq!(cmd.player(), 9);
        assert_eq!(ObserverCommand::Leave { player: 3 }.player(), 3);
    }
}
