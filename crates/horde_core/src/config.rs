//! Simulation tunables.
//!
//! Everything here is authored in seconds and world units and may be
//! loaded from RON; conversion to ticks happens inside the authority.
//! Missing fields fall back to [`SimulationConfig::default`].

use serde::{Deserialize, Serialize};

use crate::arena::Arena;
use crate::math::{fixed_decimal, Fixed};
use crate::player::PlayerStats;
use crate::spawn::SpawnValidator;

/// Authority configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed for every random choice in the match.
    pub seed: u64,
    /// Delay before the first wave may start.
    #[serde(with = "fixed_decimal")]
    pub warmup_seconds: Fixed,
    /// Pause between a wave completing and the next starting.
    #[serde(with = "fixed_decimal")]
    pub wave_rest_seconds: Fixed,
    /// Spawn point sampling.
    pub spawn: SpawnValidator,
    /// Player stats.
    pub player: PlayerStats,
    /// Level geometry.
    pub arena: Arena,
    /// Downward acceleration, units per second squared.
    #[serde(with = "fixed_decimal")]
    pub gravity: Fixed,
    /// Bodies below this height are dead.
    #[serde(with = "fixed_decimal")]
    pub fall_threshold: Fixed,
    /// Projectile lifetime in seconds.
    #[serde(with = "fixed_decimal")]
    pub projectile_lifetime: Fixed,
    /// Contact radius between a projectile and a body center.
    #[serde(with = "fixed_decimal")]
    pub hit_radius: Fixed,
    /// Slack added to a player's range when validating attack intents.
    #[serde(with = "fixed_decimal")]
    pub attack_range_tolerance: Fixed,
    /// Seconds an exploded bomber lingers before removal.
    #[serde(with = "fixed_decimal")]
    pub explosion_cleanup_seconds: Fixed,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            warmup_seconds: Fixed::from_num(2),
            wave_rest_seconds: Fixed::ZERO,
            spawn: SpawnValidator::default(),
            player: PlayerStats::default(),
            arena: Arena::default(),
            gravity: Fixed::from_num(9.81),
            fall_threshold: Fixed::from_num(-10),
            projectile_lifetime: Fixed::from_num(5),
            hit_radius: Fixed::from_num(0.75),
            attack_range_tolerance: Fixed::from_num(1),
            explosion_cleanup_seconds: Fixed::from_num(0.1),
        }
    }
}

impl SimulationConfig {
    /// Default config with a specific seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config: SimulationConfig =
            ron::from_str("(seed: 42, warmup_seconds: 0.5, player: (max_health: 20))").unwrap();
        assert_eq!(config.seed, 42);
        assert_eq!(config.warmup_seconds, Fixed::from_num(0.5));
        assert_eq!(config.player.max_health, 20);
        assert_eq!(config.player.speed, Fixed::from_num(5));
        assert_eq!(config.spawn.max_attempts, 20);
        assert_eq!(config.arena, Arena::default());
    }
}
