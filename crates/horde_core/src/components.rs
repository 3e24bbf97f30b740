//! Component definitions shared by players, enemies and projectiles.
//!
//! Components are pure data with little behavior. The authority
//! composes them into the entity records in [`crate::player`] and
//! [`crate::simulation`].

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed, Vec3Fixed};

/// Unique identifier for entities.
///
/// Players, enemies and projectiles share one id space so that timers
/// and replication events can key on a single number.
pub type EntityId = u64;

/// Health component for damageable entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Health {
    /// Current health points.
    pub current: u32,
    /// Maximum health points.
    pub max: u32,
}

impl Health {
    /// Create new health component at full health.
    #[must_use]
    pub const fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    /// Check if entity is dead (health == 0).
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.current == 0
    }

    /// Apply damage, returning actual damage dealt.
    /// Uses saturating subtraction to prevent underflow.
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        let actual = amount.min(self.current);
        self.current = self.current.saturating_sub(actual);
        actual
    }

    /// Heal the entity, returning actual amount healed.
    /// Uses saturating addition to prevent overflow.
    pub fn heal(&mut self, amount: u32) -> u32 {
        let headroom = self.max.saturating_sub(self.current);
        let actual = amount.min(headroom);
        self.current = self.current.saturating_add(actual);
        actual
    }

    /// Replace the maximum and refill to it.
    pub fn reset_max(&mut self, max: u32) {
        self.max = max;
        self.current = max;
    }
}

/// World placement of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transform {
    /// Position of the entity's feet.
    pub position: Vec3Fixed,
    /// Horizontal unit vector the entity faces.
    pub facing: Vec3Fixed,
}

impl Transform {
    /// Transform at `position` facing +Z.
    #[must_use]
    pub const fn at(position: Vec3Fixed) -> Self {
        Self {
            position,
            facing: Vec3Fixed::FORWARD,
        }
    }
}

/// Kinematic state of a ground-bound body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Motion {
    /// Horizontal velocity, units per second.
    pub velocity: Vec3Fixed,
    /// Vertical velocity, units per second.
    #[serde(with = "fixed_serde")]
    pub vertical_velocity: Fixed,
    /// Standing on a surface this tick.
    pub grounded: bool,
}

/// Which side fired a projectile, and therefore what it can hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Fired by a player; hits enemies.
    Players,
    /// Fired by an enemy; hits players.
    Enemies,
}

// ============================================================================
// Projectile Component
// ============================================================================

/// A projectile in flight.
///
/// Projectiles fly in a straight line toward the position their target
/// held when they were fired. Damage is applied on contact, so a target
/// that moves away in time is missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Projectile {
    /// Entity that fired this projectile.
    pub source: EntityId,
    /// Side the shooter belongs to.
    pub side: Side,
    /// Current position.
    pub position: Vec3Fixed,
    /// Velocity in units per second.
    pub velocity: Vec3Fixed,
    /// Damage to deal on impact.
    pub damage: u32,
}

impl Projectile {
    /// Create a projectile at `origin` flying toward `aim` at `speed`.
    #[must_use]
    pub fn aimed(
        source: EntityId,
        side: Side,
        origin: Vec3Fixed,
        aim: Vec3Fixed,
        speed: Fixed,
        damage: u32,
    ) -> Self {
        let direction = (aim - origin).normalize();
        let direction = if direction.is_zero() {
            Vec3Fixed::FORWARD
        } else {
            direction
        };
        Self {
            source,
            side,
            position: origin,
            velocity: direction.scale(speed),
            damage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_damage_saturates() {
        let mut health = Health::new(5);
        assert_eq!(health.apply_damage(3), 3);
        assert_eq!(health.apply_damage(10), 2);
        assert!(health.is_dead());
        assert_eq!(health.current, 0);
    }

    #[test]
    fn test_health_heal_clamps() {
        let mut health = Health::new(10);
        health.apply_damage(4);
        assert_eq!(health.heal(100), 4);
        assert_eq!(health.current, health.max);
    }

    #[test]
    fn test_reset_max_refills() {
        let mut health = Health::new(5);
        health.apply_damage(2);
        health.reset_max(10);
        assert_eq!(health, Health::new(10));

        health.reset_max(u32::MAX);
        assert_eq!(health.current, u32::MAX);
    }

    #[test]
    fn test_projectile_aimed_at_own_position_still_moves() {
        let p = Projectile::aimed(
            1,
            Side::Players,
            Vec3Fixed::ZERO,
            Vec3Fixed::ZERO,
            Fixed::from_num(10),
            1,
        );
        assert_eq!(p.velocity, Vec3Fixed::FORWARD.scale(Fixed::from_num(10)));
    }
}
