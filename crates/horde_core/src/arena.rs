//! Arena geometry: the platforms enemies may spawn on and bodies stand on.
//!
//! The authority never needs a full physics scene. It needs two
//! queries: "is there ground below this point" (spawn validation) and
//! "how high is the ground here" (grounding and fall checks).

use serde::{Deserialize, Serialize};

use crate::math::{fixed_decimal, Fixed, Vec3Fixed};

/// Anything that can answer a downward probe for spawnable ground.
pub trait SpawnSurface {
    /// Cast a probe straight down from `origin` for at most `max_distance`.
    ///
    /// Returns the height of the first spawnable surface hit.
    fn probe_down(&self, origin: Vec3Fixed, max_distance: Fixed) -> Option<Fixed>;
}

/// Axis-aligned walkable platform, described by its top face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    /// Minimum X of the footprint.
    #[serde(with = "fixed_decimal")]
    pub min_x: Fixed,
    /// Minimum Z of the footprint.
    #[serde(with = "fixed_decimal")]
    pub min_z: Fixed,
    /// Maximum X of the footprint.
    #[serde(with = "fixed_decimal")]
    pub max_x: Fixed,
    /// Maximum Z of the footprint.
    #[serde(with = "fixed_decimal")]
    pub max_z: Fixed,
    /// Height of the top face.
    #[serde(with = "fixed_decimal")]
    pub top: Fixed,
    /// Whether enemies may spawn on this platform.
    #[serde(default = "default_spawnable")]
    pub spawnable: bool,
}

const fn default_spawnable() -> bool {
    true
}

impl Platform {
    /// Square platform centered on the origin.
    #[must_use]
    pub fn square(half_extent: Fixed, top: Fixed) -> Self {
        Self {
            min_x: -half_extent,
            min_z: -half_extent,
            max_x: half_extent,
            max_z: half_extent,
            top,
            spawnable: true,
        }
    }

    /// Whether the footprint contains the ground-plane point.
    #[must_use]
    pub fn contains(&self, x: Fixed, z: Fixed) -> bool {
        x >= self.min_x && x <= self.max_x && z >= self.min_z && z <= self.max_z
    }
}

/// Collection of platforms making up the playable level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arena {
    /// Platforms, in no particular order.
    pub platforms: Vec<Platform>,
}

impl Default for Arena {
    fn default() -> Self {
        Self::flat(Fixed::from_num(20))
    }
}

impl Arena {
    /// Arena with no ground at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            platforms: Vec::new(),
        }
    }

    /// A single square floor at height zero.
    #[must_use]
    pub fn flat(half_extent: Fixed) -> Self {
        Self {
            platforms: vec![Platform::square(half_extent, Fixed::ZERO)],
        }
    }

    /// Add a platform (builder style).
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platforms.push(platform);
        self
    }

    /// Highest surface at or below `position`, if any.
    #[must_use]
    pub fn ground_below(&self, position: Vec3Fixed) -> Option<Fixed> {
        self.platforms
            .iter()
            .filter(|p| p.contains(position.x, position.z) && p.top <= position.y)
            .map(|p| p.top)
            .max()
    }

    /// Integrate vertical motion for one step and resolve landing.
    ///
    /// Returns whether the body ends the step standing on a platform.
    pub fn settle(
        &self,
        position: &mut Vec3Fixed,
        vertical_velocity: &mut Fixed,
        gravity: Fixed,
        dt: Fixed,
    ) -> bool {
        let ground = self.ground_below(*position);
        let standing = ground.is_some_and(|h| position.y == h);
        if standing && *vertical_velocity <= Fixed::ZERO {
            *vertical_velocity = Fixed::ZERO;
            return true;
        }

        *vertical_velocity -= gravity * dt;
        let next_y = position.y + *vertical_velocity * dt;
        match ground {
            Some(h) if next_y <= h && *vertical_velocity <= Fixed::ZERO => {
                position.y = h;
                *vertical_velocity = Fixed::ZERO;
                true
            }
            _ => {
                position.y = next_y;
                false
            }
        }
    }
}

impl SpawnSurface for Arena {
    fn probe_down(&self, origin: Vec3Fixed, max_distance: Fixed) -> Option<Fixed> {
        self.platforms
            .iter()
            .filter(|p| p.spawnable && p.contains(origin.x, origin.z))
            .filter(|p| p.top <= origin.y && origin.y - p.top <= max_distance)
            .map(|p| p.top)
            .max()
    }
}
