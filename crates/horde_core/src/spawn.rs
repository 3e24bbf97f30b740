//! Spatial spawn validation.
//!
//! Enemies appear on a ring around a chosen player. Each candidate is
//! kept only if a downward probe finds spawnable ground beneath it, so
//! enemies never materialize over a pit.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::arena::SpawnSurface;
use crate::math::{fixed_decimal, sin_cos_degrees, Fixed, Vec3Fixed};

/// Samples spawn points on a circle and validates them against the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnValidator {
    /// Ring radius around the reference point.
    #[serde(with = "fixed_decimal")]
    pub radius: Fixed,
    /// Absolute height at which candidates are placed.
    #[serde(with = "fixed_decimal")]
    pub spawn_height: Fixed,
    /// Maximum length of the downward probe.
    #[serde(with = "fixed_decimal")]
    pub probe_distance: Fixed,
    /// Candidates tried before giving up.
    pub max_attempts: u32,
}

impl Default for SpawnValidator {
    fn default() -> Self {
        Self {
            radius: Fixed::from_num(5),
            spawn_height: Fixed::from_num(1),
            probe_distance: Fixed::from_num(5),
            max_attempts: 20,
        }
    }
}

impl SpawnValidator {
    /// Candidate point at `degrees` around `center`.
    #[must_use]
    pub fn candidate(&self, center: Vec3Fixed, degrees: i32) -> Vec3Fixed {
        let (sin, cos) = sin_cos_degrees(degrees);
        Vec3Fixed::new(
            center.x + self.radius * cos,
            self.spawn_height,
            center.z + self.radius * sin,
        )
    }

    /// Find a spawn point around `center`.
    ///
    /// Returns `None` when every attempt fails; the caller skips the
    /// spawn. Never loops beyond `max_attempts`.
    pub fn find_spawn_point<S, R>(
        &self,
        center: Vec3Fixed,
        surface: &S,
        rng: &mut R,
    ) -> Option<Vec3Fixed>
    where
        S: SpawnSurface + ?Sized,
        R: Rng,
    {
        for attempt in 0..self.max_attempts {
            let degrees = rng.gen_range(0..360);
            let point = self.candidate(center, degrees);
            if surface.probe_down(point, self.probe_distance).is_some() {
                tracing::trace!(attempt, degrees, "Spawn point accepted");
                return Some(point);
            }
        }
        tracing::debug!(
            attempts = self.max_attempts,
            x = center.x.to_num::<f64>(),
            z = center.z.to_num::<f64>(),
            "No valid spawn point found"
        );
        None
    }
}
