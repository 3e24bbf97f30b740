//! Player entities, their movement model, and the explicit roster.
//!
//! Players persist for the whole match. A player whose health reaches
//! zero keeps its entity, switches to [`PlayerTag::Spectator`] and is
//! excluded from every "living players" query.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::{EntityId, Health, Motion, Transform};
use crate::math::{fixed_decimal, Fixed, Vec3Fixed};

/// Tunable player stats, shared by every player in a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerStats {
    /// Starting and maximum health.
    pub max_health: u32,
    /// Top ground speed, units per second.
    #[serde(with = "fixed_decimal")]
    pub speed: Fixed,
    /// Velocity smoothing rate per second.
    #[serde(with = "fixed_decimal")]
    pub deceleration: Fixed,
    /// Below this speed, with no input, the player stops dead.
    #[serde(with = "fixed_decimal")]
    pub min_speed: Fixed,
    /// Initial upward velocity of a jump.
    #[serde(with = "fixed_decimal")]
    pub jump_force: Fixed,
    /// Damage per projectile.
    pub attack_damage: u32,
    /// Seconds between attacks (also the auto-attack scan cadence).
    #[serde(with = "fixed_decimal")]
    pub attack_rate: Fixed,
    /// Auto-attack acquisition radius.
    #[serde(with = "fixed_decimal")]
    pub range_radius: Fixed,
    /// Projectile speed, units per second.
    #[serde(with = "fixed_decimal")]
    pub projectile_speed: Fixed,
    /// Scan for targets automatically.
    pub auto_attack: bool,
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self {
            max_health: 10,
            speed: Fixed::from_num(5),
            deceleration: Fixed::from_num(5),
            min_speed: Fixed::from_num(0.1),
            jump_force: Fixed::from_num(5),
            attack_damage: 1,
            attack_rate: Fixed::from_num(1),
            range_radius: Fixed::from_num(10),
            projectile_speed: Fixed::from_num(20),
            auto_attack: true,
        }
    }
}

/// Whether a player is still fighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerTag {
    /// Alive and participating.
    Fighter,
    /// Dead; watches the rest of the match.
    Spectator,
}

/// A connected player.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Player {
    /// Entity id.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Health.
    pub health: Health,
    /// Placement.
    pub transform: Transform,
    /// Kinematics.
    pub motion: Motion,
    /// Requested ground direction (length <= 1).
    pub intent: Vec3Fixed,
    /// Jump requested since the last physics step.
    pub jump_requested: bool,
    /// Earliest tick the next attack may fire.
    pub weapon_ready_at: u64,
    /// Tick of the next auto-attack scan.
    pub next_scan_at: u64,
    /// Set once, when health first reaches zero.
    pub died: bool,
    /// Fighter or spectator.
    pub tag: PlayerTag,
    /// Enemies killed.
    pub kills: u32,
}

impl Player {
    /// Create a fighter at full health.
    #[must_use]
    pub fn new(id: EntityId, name: impl Into<String>, max_health: u32, position: Vec3Fixed) -> Self {
        Self {
            id,
            name: name.into(),
            health: Health::new(max_health),
            transform: Transform::at(position),
            motion: Motion::default(),
            intent: Vec3Fixed::ZERO,
            jump_requested: false,
            weapon_ready_at: 0,
            next_scan_at: 0,
            died: false,
            tag: PlayerTag::Fighter,
            kills: 0,
        }
    }

    /// Alive and fighting.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        !self.died
    }

    /// Current position.
    #[must_use]
    pub const fn position(&self) -> Vec3Fixed {
        self.transform.position
    }

    /// Set the movement intent from an observer direction.
    pub fn set_intent(&mut self, direction: Vec3Fixed) {
        self.intent = direction.horizontal().clamp_length(Fixed::from_num(1));
    }

    /// Mark the player dead: spectator, no movement, no attacks.
    pub fn mark_dead(&mut self) {
        self.died = true;
        self.tag = PlayerTag::Spectator;
        self.intent = Vec3Fixed::ZERO;
        self.jump_requested = false;
        self.motion.velocity = Vec3Fixed::ZERO;
    }
}

/// One step of velocity smoothing toward `direction * speed`.
///
/// `velocity = lerp(velocity, direction * speed, dt * deceleration)`;
/// with no input and a result slower than `min_speed`, the velocity
/// snaps to zero.
#[must_use]
pub fn smoothed_velocity(current: Vec3Fixed, direction: Vec3Fixed, stats: &PlayerStats, dt: Fixed) -> Vec3Fixed {
    let target = direction.scale(stats.speed);
    let t = (dt * stats.deceleration).min(Fixed::from_num(1));
    let next = current.lerp(target, t);
    if direction.is_zero() && next.length() < stats.min_speed {
        Vec3Fixed::ZERO
    } else {
        next
    }
}

/// The match roster, keyed by entity id.
///
/// Passed explicitly to the scheduler and to enemy AI; iteration is
/// in id order, which is join order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PlayerRegistry {
    players: BTreeMap<EntityId, Player>,
}

impl PlayerRegistry {
    /// Create an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a player, replacing any with the same id.
    pub fn insert(&mut self, player: Player) {
        self.players.insert(player.id, player);
    }

    /// Remove a player from the roster.
    pub fn remove(&mut self, id: EntityId) -> Option<Player> {
        self.players.remove(&id)
    }

    /// Get a player by id.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Player> {
        self.players.get(&id)
    }

    /// Get a mutable player by id.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    /// Whether the id is on the roster.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.players.contains_key(&id)
    }

    /// Roster size, dead players included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Whether the roster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// All players in roster order.
    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Living players in roster order.
    pub fn living(&self) -> impl Iterator<Item = &Player> {
        self.players.values().filter(|p| p.is_alive())
    }

    /// Ids of living players in roster order.
    #[must_use]
    pub fn living_ids(&self) -> Vec<EntityId> {
        self.living().map(|p| p.id).collect()
    }

    /// Number of living players.
    #[must_use]
    pub fn living_count(&self) -> usize {
        self.living().count()
    }

    /// Ids of every player in roster order.
    #[must_use]
    pub fn ids(&self) -> Vec<EntityId> {
        self.players.keys().copied().collect()
    }

    /// Credit a kill. Unknown ids are ignored.
    pub fn record_kill(&mut self, id: EntityId) {
        if let Some(player) = self.players.get_mut(&id) {
            player.kills += 1;
        }
    }
}
