//! Enemy archetype templates and their registry.
//!
//! An archetype is the stat block every enemy of that kind starts
//! from, plus a tagged [`ArchetypeKind`] that selects its behavior.
//! Templates are authored in RON:
//!
//! ```ron
//! (
//!     archetypes: [
//!         (
//!             name: "bomber",
//!             max_health: 3,
//!             speed: 6.0,
//!             kind: Bomber(explosion_radius: 3.0, explosion_damage: 10),
//!         ),
//!     ],
//! )
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::{fixed_decimal, option_fixed_decimal, Fixed};

/// Behavior variant of an archetype, with its variant-only parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchetypeKind {
    /// Closes to stopping distance and strikes on a cooldown.
    Melee,
    /// Closes to stopping distance and detonates once.
    Bomber {
        /// Radius of the blast.
        #[serde(with = "fixed_decimal", default = "default_explosion_radius")]
        explosion_radius: Fixed,
        /// Damage dealt to every player in the blast.
        #[serde(default = "default_explosion_damage")]
        explosion_damage: u32,
    },
    /// Keeps its distance and fires projectiles.
    Sniper {
        /// Maximum firing distance.
        #[serde(with = "fixed_decimal", default = "default_shoot_range")]
        shoot_range: Fixed,
        /// Seconds between shots.
        #[serde(with = "fixed_decimal", default = "default_shoot_cooldown")]
        shoot_cooldown: Fixed,
        /// Retreats when a player is closer than this.
        #[serde(with = "fixed_decimal", default = "default_min_distance")]
        min_distance: Fixed,
        /// Projectile speed, units per second.
        #[serde(with = "fixed_decimal", default = "default_projectile_speed")]
        projectile_speed: Fixed,
        /// Damage per projectile.
        #[serde(default = "default_projectile_damage")]
        projectile_damage: u32,
    },
}

impl ArchetypeKind {
    /// Short label used in logs and replication.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Melee => "melee",
            Self::Bomber { .. } => "bomber",
            Self::Sniper { .. } => "sniper",
        }
    }
}

/// Stat block shared by every enemy of one archetype.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchetypeTemplate {
    /// Registry key, matched case-insensitively.
    pub name: String,

    /// Base maximum health before wave and player scaling.
    #[serde(default = "default_max_health")]
    pub max_health: u32,

    /// Top movement speed, units per second.
    #[serde(with = "fixed_decimal", default = "default_speed")]
    pub speed: Fixed,

    /// Velocity change per second.
    #[serde(with = "fixed_decimal", default = "default_acceleration")]
    pub acceleration: Fixed,

    /// Stops advancing within this distance of its target.
    #[serde(with = "fixed_decimal", default = "default_stopping_distance")]
    pub stopping_distance: Fixed,

    /// Melee damage per strike.
    #[serde(default = "default_attack_damage")]
    pub attack_damage: u32,

    /// Seconds between melee strikes.
    #[serde(with = "fixed_decimal", default = "default_attack_rate")]
    pub attack_rate: Fixed,

    /// Seconds between cosmetic hops.
    #[serde(with = "fixed_decimal", default = "default_hop_cooldown")]
    pub hop_cooldown: Fixed,

    /// Peak height of a cosmetic hop.
    #[serde(with = "fixed_decimal", default = "default_hop_height")]
    pub hop_height: Fixed,

    /// Duration of a cosmetic hop in seconds.
    #[serde(with = "fixed_decimal", default = "default_hop_duration")]
    pub hop_duration: Fixed,

    /// Only players within this radius are noticed. `None` = unbounded.
    #[serde(with = "option_fixed_decimal", default)]
    pub detection_radius: Option<Fixed>,

    /// Behavior variant.
    #[serde(default = "default_kind")]
    pub kind: ArchetypeKind,
}

const fn default_max_health() -> u32 {
    5
}

fn default_speed() -> Fixed {
    Fixed::from_num(5)
}

fn default_acceleration() -> Fixed {
    Fixed::from_num(8)
}

fn default_stopping_distance() -> Fixed {
    Fixed::from_num(2)
}

const fn default_attack_damage() -> u32 {
    1
}

fn default_attack_rate() -> Fixed {
    Fixed::from_num(2)
}

fn default_hop_cooldown() -> Fixed {
    Fixed::from_num(1)
}

fn default_hop_height() -> Fixed {
    Fixed::from_num(1.5)
}

fn default_hop_duration() -> Fixed {
    Fixed::from_num(0.5)
}

const fn default_kind() -> ArchetypeKind {
    ArchetypeKind::Melee
}

fn default_explosion_radius() -> Fixed {
    Fixed::from_num(3)
}

const fn default_explosion_damage() -> u32 {
    10
}

fn default_shoot_range() -> Fixed {
    Fixed::from_num(15)
}

fn default_shoot_cooldown() -> Fixed {
    Fixed::from_num(3)
}

fn default_min_distance() -> Fixed {
    Fixed::from_num(6)
}

fn default_projectile_speed() -> Fixed {
    Fixed::from_num(10)
}

const fn default_projectile_damage() -> u32 {
    1
}

impl ArchetypeTemplate {
    /// Template with default stats for the given kind.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ArchetypeKind) -> Self {
        Self {
            name: name.into(),
            max_health: default_max_health(),
            speed: default_speed(),
            acceleration: default_acceleration(),
            stopping_distance: default_stopping_distance(),
            attack_damage: default_attack_damage(),
            attack_rate: default_attack_rate(),
            hop_cooldown: default_hop_cooldown(),
            hop_height: default_hop_height(),
            hop_duration: default_hop_duration(),
            detection_radius: None,
            kind,
        }
    }

    /// Set base max health.
    #[must_use]
    pub const fn with_max_health(mut self, max_health: u32) -> Self {
        self.max_health = max_health;
        self
    }

    /// Set movement speed.
    #[must_use]
    pub fn with_speed(mut self, speed: Fixed) -> Self {
        self.speed = speed;
        self
    }

    /// Set melee damage and cadence.
    #[must_use]
    pub fn with_attack(mut self, damage: u32, rate: Fixed) -> Self {
        self.attack_damage = damage;
        self.attack_rate = rate;
        self
    }

    /// Set stopping distance.
    #[must_use]
    pub fn with_stopping_distance(mut self, distance: Fixed) -> Self {
        self.stopping_distance = distance;
        self
    }

    /// Bound target acquisition to a radius.
    #[must_use]
    pub fn with_detection_radius(mut self, radius: Fixed) -> Self {
        self.detection_radius = Some(radius);
        self
    }

    /// Registry key for this template.
    #[must_use]
    pub fn key(&self) -> String {
        self.name.to_ascii_lowercase()
    }
}

#[derive(Debug, Deserialize)]
struct ArchetypeDocument {
    archetypes: Vec<ArchetypeTemplate>,
}

/// All archetypes known to the authority, keyed by lowercase name.
///
/// Iteration order is alphabetical so random picks over "any known
/// archetype" stay deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchetypeRegistry {
    templates: BTreeMap<String, ArchetypeTemplate>,
}

impl ArchetypeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in slime, bomber and sniper templates.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.insert(ArchetypeTemplate::new("slime", ArchetypeKind::Melee));
        registry.insert(
            ArchetypeTemplate::new(
                "bomber",
                ArchetypeKind::Bomber {
                    explosion_radius: default_explosion_radius(),
                    explosion_damage: default_explosion_damage(),
                },
            )
            .with_max_health(3)
            .with_speed(Fixed::from_num(6)),
        );
        registry.insert(
            ArchetypeTemplate::new(
                "sniper",
                ArchetypeKind::Sniper {
                    shoot_range: default_shoot_range(),
                    shoot_cooldown: default_shoot_cooldown(),
                    min_distance: default_min_distance(),
                    projectile_speed: default_projectile_speed(),
                    projectile_damage: default_projectile_damage(),
                },
            )
            .with_speed(Fixed::from_num(4))
            .with_stopping_distance(Fixed::from_num(10)),
        );
        registry
    }

    /// Parse a RON archetype document.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParseError`] if the document is malformed.
    pub fn from_ron_str(source: &str, text: &str) -> Result<Self> {
        let document: ArchetypeDocument =
            ron::from_str(text).map_err(|e| GameError::DataParseError {
                path: source.to_string(),
                message: e.to_string(),
            })?;

        let mut registry = Self::new();
        for template in document.archetypes {
            if let Some(previous) = registry.insert(template) {
                tracing::warn!(archetype = %previous.name, source, "Duplicate archetype replaced");
            }
        }
        Ok(registry)
    }

    /// Register a template, returning any template it replaced.
    pub fn insert(&mut self, template: ArchetypeTemplate) -> Option<ArchetypeTemplate> {
        self.templates.insert(template.key(), template)
    }

    /// Look up a template by name (case-insensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ArchetypeTemplate> {
        self.templates.get(&name.to_ascii_lowercase())
    }

    /// Look up a template, failing on unknown names.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownArchetype`] if no template matches.
    pub fn resolve(&self, name: &str) -> Result<&ArchetypeTemplate> {
        self.get(name)
            .ok_or_else(|| GameError::UnknownArchetype(name.to_string()))
    }

    /// Whether a template with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registry keys in alphabetical order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// All templates in key order.
    pub fn templates(&self) -> impl Iterator<Item = &ArchetypeTemplate> {
        self.templates.values()
    }

    /// Number of templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_has_three_kinds() {
        let registry = ArchetypeRegistry::builtin();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.resolve("slime").unwrap().kind, ArchetypeKind::Melee);
        assert!(matches!(
            registry.resolve("Bomber").unwrap().kind,
            ArchetypeKind::Bomber { .. }
        ));
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["bomber", "slime", "sniper"]
        );
    }

    #[test]
    fn test_parse_ron_with_defaults() {
        let text = r#"(
            archetypes: [
                (name: "Grunt", max_health: 8, speed: 3.5),
                (name: "boom", kind: Bomber(explosion_radius: 4.0)),
                (name: "eye", detection_radius: Some(12.0), kind: Sniper(shoot_range: 20.0)),
            ],
        )"#;
        let registry = ArchetypeRegistry::from_ron_str("inline", text).unwrap();

        let grunt = registry.resolve("grunt").unwrap();
        assert_eq!(grunt.max_health, 8);
        assert_eq!(grunt.speed, Fixed::from_num(3.5));
        assert_eq!(grunt.attack_rate, Fixed::from_num(2));
        assert_eq!(grunt.kind, ArchetypeKind::Melee);

        match &registry.resolve("boom").unwrap().kind {
            ArchetypeKind::Bomber {
                explosion_radius,
                explosion_damage,
            } => {
                assert_eq!(*explosion_radius, Fixed::from_num(4));
                assert_eq!(*explosion_damage, 10);
            }
            other => panic!("unexpected kind {other:?}"),
        }

        let eye = registry.resolve("eye").unwrap();
        assert_eq!(eye.detection_radius, Some(Fixed::from_num(12)));
        assert_eq!(eye.kind.label(), "sniper");
    }

    #[test]
    fn test_malformed_ron_is_parse_error() {
        let err = ArchetypeRegistry::from_ron_str("bad.ron", "(archetypes: [ (name: ").unwrap_err();
        assert!(matches!(err, GameError::DataParseError { ref path, .. } if path == "bad.ron"));
    }

    #[test]
    fn test_unknown_archetype() {
        let registry = ArchetypeRegistry::builtin();
        assert!(matches!(
            registry.resolve("dragon"),
            Err(GameError::UnknownArchetype(name)) if name == "dragon"
        ));
    }
}
