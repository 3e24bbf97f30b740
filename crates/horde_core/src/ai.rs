//! Enemy behavior state machines.
//!
//! Every enemy carries an [`EnemyBrain`]; each tick the authority
//! senses the nearest living player and asks [`decide`] what to do.
//! `decide` is a pure function of the archetype, the brain and the
//! sighting, with a single dispatch on [`ArchetypeKind`]. Executing
//! the returned [`EnemyAction`] (moving, hurting, spawning projectiles,
//! scheduling cooldowns) is the authority's job.
//!
//! | Kind   | States                         |
//! |--------|--------------------------------|
//! | Melee  | Seek, Attack                   |
//! | Sniper | Seek, Retreat, Shoot           |
//! | Bomber | Seek, Explode (one-shot)       |

use serde::{Deserialize, Serialize};

use crate::archetype::{ArchetypeKind, ArchetypeTemplate};
use crate::components::EntityId;
use crate::math::{Fixed, Vec3Fixed};
use crate::player::PlayerRegistry;

/// Facing turn rate per second for most enemies.
pub const TURN_RATE: Fixed = Fixed::from_bits(10 << 32);

/// Slower turn rate used by snipers while aiming.
pub const AIM_TURN_RATE: Fixed = Fixed::from_bits(5 << 32);

/// Behavior state, replicated for animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EnemyState {
    /// Moving toward the target (or idle without one).
    #[default]
    Seek,
    /// In melee range.
    Attack,
    /// Backing away from a target that got too close.
    Retreat,
    /// In firing range.
    Shoot,
    /// Detonating or detonated.
    Explode,
}

/// Mutable per-enemy behavior memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnemyBrain {
    /// Current state.
    pub state: EnemyState,
    /// Player targeted on the last decision.
    pub target: Option<EntityId>,
    /// Melee strike or shot available.
    pub weapon_ready: bool,
    /// Cosmetic hop available.
    pub hop_ready: bool,
    /// Bomber has gone off. Set before the blast is resolved.
    pub has_exploded: bool,
}

impl Default for EnemyBrain {
    fn default() -> Self {
        Self {
            state: EnemyState::Seek,
            target: None,
            weapon_ready: true,
            hop_ready: true,
            has_exploded: false,
        }
    }
}

/// The nearest living player as seen by one enemy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sighting {
    /// Player id.
    pub player: EntityId,
    /// Player position.
    pub position: Vec3Fixed,
    /// Distance from the enemy.
    pub distance: Fixed,
}

/// What an enemy does this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnemyAction {
    /// No target; slow to a stop.
    Idle,
    /// Hold position facing the target (cooling down).
    Hold,
    /// Move toward a point.
    MoveToward(Vec3Fixed),
    /// Move directly away from a point.
    MoveAway(Vec3Fixed),
    /// Melee strike on a player.
    Strike(EntityId),
    /// Fire a projectile at a player's current position.
    Shoot {
        /// Target player.
        target: EntityId,
        /// Aim point.
        aim: Vec3Fixed,
    },
    /// Detonate.
    Explode,
}

/// Find the nearest living player to `from`.
///
/// Linear scan in roster order; ties keep the first found. With a
/// `range`, players farther than it are ignored.
#[must_use]
pub fn nearest_player(
    players: &PlayerRegistry,
    from: Vec3Fixed,
    range: Option<Fixed>,
) -> Option<Sighting> {
    let mut best: Option<Sighting> = None;
    for player in players.living() {
        let distance = from.distance(player.position());
        if range.is_some_and(|r| distance > r) {
            continue;
        }
        if best.map_or(true, |b| distance < b.distance) {
            best = Some(Sighting {
                player: player.id,
                position: player.position(),
                distance,
            });
        }
    }
    best
}

/// Decide the next state and action for one enemy.
#[must_use]
pub fn decide(
    template: &ArchetypeTemplate,
    brain: &EnemyBrain,
    sighting: Option<&Sighting>,
) -> (EnemyState, EnemyAction) {
    if let ArchetypeKind::Bomber { .. } = template.kind {
        if brain.has_exploded {
            return (EnemyState::Explode, EnemyAction::Idle);
        }
    }

    let Some(target) = sighting else {
        return (EnemyState::Seek, EnemyAction::Idle);
    };

    match &template.kind {
        ArchetypeKind::Melee => {
            if target.distance > template.stopping_distance {
                (EnemyState::Seek, EnemyAction::MoveToward(target.position))
            } else if brain.weapon_ready {
                (EnemyState::Attack, EnemyAction::Strike(target.player))
            } else {
                (EnemyState::Attack, EnemyAction::Hold)
            }
        }
        ArchetypeKind::Bomber { .. } => {
            if target.distance > template.stopping_distance {
                (EnemyState::Seek, EnemyAction::MoveToward(target.position))
            } else {
                (EnemyState::Explode, EnemyAction::Explode)
            }
        }
        ArchetypeKind::Sniper {
            shoot_range,
            min_distance,
            ..
        } => {
            if target.distance < *min_distance {
                (EnemyState::Retreat, EnemyAction::MoveAway(target.position))
            } else if target.distance <= *shoot_range {
                if brain.weapon_ready {
                    (
                        EnemyState::Shoot,
                        EnemyAction::Shoot {
                            target: target.player,
                            aim: target.position,
                        },
                    )
                } else {
                    (EnemyState::Shoot, EnemyAction::Hold)
                }
            } else {
                (EnemyState::Seek, EnemyAction::MoveToward(target.position))
            }
        }
    }
}

/// Accelerate `velocity` toward `desired`, changing by at most
/// `acceleration * dt` this step.
#[must_use]
pub fn steer(velocity: Vec3Fixed, desired: Vec3Fixed, acceleration: Fixed, dt: Fixed) -> Vec3Fixed {
    let delta = (desired - velocity).clamp_length(acceleration * dt);
    velocity + delta
}

/// Turn a horizontal facing toward `toward`, blending by `rate * dt`.
#[must_use]
pub fn turn_toward(facing: Vec3Fixed, toward: Vec3Fixed, rate: Fixed, dt: Fixed) -> Vec3Fixed {
    let desired = toward.horizontal().normalize();
    if desired.is_zero() {
        return facing;
    }
    let t = (rate * dt).min(Fixed::from_num(1));
    let blended = facing.lerp(desired, t).normalize();
    if blended.is_zero() {
        desired
    } else {
        blended
    }
}
