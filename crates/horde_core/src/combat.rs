//! Combat resolution.
//!
//! The single authoritative path for changing health. Death is
//! reported exactly once: once health reaches zero, further damage is
//! a no-op that reports `died = false`. Side effects of a death
//! (kill credit, removal, spectating) belong to the caller, which
//! knows what kind of entity it hurt.

use serde::{Deserialize, Serialize};

use crate::components::{EntityId, Health};
use crate::math::{Fixed, Vec3Fixed};

/// Outcome of a single [`hurt`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombatEvent {
    /// Entity that was hit.
    pub target: EntityId,
    /// Damage actually removed from health.
    pub damage: u32,
    /// Health after the hit.
    pub resulting_health: u32,
    /// This hit killed the target.
    pub died: bool,
}

impl CombatEvent {
    /// Whether the hit changed any state.
    #[must_use]
    pub const fn changed_health(&self) -> bool {
        self.damage > 0
    }
}

/// Apply `damage` to a living target.
///
/// Dead targets are left untouched and produce an event with zero
/// damage and `died = false`.
pub fn hurt(health: &mut Health, target: EntityId, damage: u32) -> CombatEvent {
    if health.is_dead() {
        return CombatEvent {
            target,
            damage: 0,
            resulting_health: 0,
            died: false,
        };
    }

    let dealt = health.apply_damage(damage);
    CombatEvent {
        target,
        damage: dealt,
        resulting_health: health.current,
        died: health.is_dead(),
    }
}

/// Restore health to a living target, clamped at max.
///
/// Returns the amount actually healed; always zero for the dead.
pub fn heal(health: &mut Health, amount: u32) -> u32 {
    if health.is_dead() {
        return 0;
    }
    health.heal(amount)
}

/// Whether `point` lies within `radius` of `center` (inclusive).
#[must_use]
pub fn within_radius(center: Vec3Fixed, point: Vec3Fixed, radius: Fixed) -> bool {
    center.distance_squared(point) <= radius.saturating_mul(radius)
}
