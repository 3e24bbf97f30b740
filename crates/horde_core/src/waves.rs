//! Wave catalog: authored wave definitions plus the synthesis rule
//! that extends a finite catalog into an endless escalation.
//!
//! # Document format
//!
//! ```json
//! { "waves": [
//!     { "name": "Opening", "enemies": [{ "archetype": "slime", "count": 5 }],
//!       "spawn_interval": 1.0, "health_multiplier": 1.0 }
//! ] }
//! ```
//!
//! Entries in the older flat form (`WaveName`, `MobsPrefab`,
//! `MobsCount`, `SpawnRate`, `SpawnRateMultiplier`, `HealthMultiplier`)
//! are accepted and migrated on load.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::{fixed_serde, Fixed};

/// Shortest spawn interval a synthesized wave may reach, in seconds.
pub const MIN_SPAWN_INTERVAL: Fixed = Fixed::from_bits(1 << 31);

/// Extra enemies per absolute wave index in synthesized waves.
pub const SYNTH_COUNT_STEP: u32 = 3;

/// Base enemy count of a synthesized wave that follows a group-form wave.
pub const SYNTH_GROUP_BASE: u32 = 10;

/// A number of enemies of one archetype.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnemyGroup {
    /// Archetype name.
    pub archetype: String,
    /// Enemies at one player.
    pub count: u32,
}

/// Which enemies a wave is made of.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WaveComposition {
    /// Ordered (archetype, count) groups, spawned in declaration order.
    Groups(Vec<EnemyGroup>),
    /// `count` enemies, each picked uniformly from `archetypes`
    /// (or from every known archetype when the list is empty).
    Pool {
        /// Candidate archetype names.
        archetypes: Vec<String>,
        /// Enemies at one player.
        count: u32,
    },
}

impl WaveComposition {
    /// Enemies at one player.
    #[must_use]
    pub fn total_count(&self) -> u32 {
        match self {
            Self::Groups(groups) => groups.iter().map(|g| g.count).sum(),
            Self::Pool { count, .. } => *count,
        }
    }

    /// Every archetype name this composition references.
    pub fn archetype_names(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        match self {
            Self::Groups(groups) => Box::new(groups.iter().map(|g| g.archetype.as_str())),
            Self::Pool { archetypes, .. } => Box::new(archetypes.iter().map(String::as_str)),
        }
    }
}

/// One wave, immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WaveDefinition {
    /// Display name.
    pub name: String,
    /// Enemy composition.
    pub composition: WaveComposition,
    /// Seconds between consecutive spawns.
    #[serde(with = "fixed_serde")]
    pub spawn_interval: Fixed,
    /// Multiplier on each enemy's base max health.
    #[serde(with = "fixed_serde")]
    pub health_multiplier: Fixed,
    /// Reserved; carried through but not used by scaling.
    #[serde(with = "fixed_serde")]
    pub spawn_rate_multiplier: Fixed,
}

impl WaveDefinition {
    /// Enemy count once scaled for `players` living players.
    #[must_use]
    pub fn scaled_count(&self, players: usize) -> u32 {
        scaled_count(self.composition.total_count(), players)
    }
}

/// `count * max(players, 1)`, saturating.
#[must_use]
pub fn scaled_count(count: u32, players: usize) -> u32 {
    let players = u32::try_from(players.max(1)).unwrap_or(u32::MAX);
    count.saturating_mul(players)
}

/// `round(base * multiplier * players)`, never below one.
#[must_use]
pub fn scaled_max_health(base: u32, multiplier: Fixed, players: usize) -> u32 {
    let players = Fixed::saturating_from_num(players);
    let scaled = Fixed::saturating_from_num(base)
        .saturating_mul(multiplier)
        .saturating_mul(players)
        .round();
    scaled.saturating_to_num::<u32>().max(1)
}

// ============================================================================
// Document forms
// ============================================================================

#[derive(Debug, Deserialize)]
struct WaveDocument {
    #[serde(default)]
    waves: Vec<WaveEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WaveEntry {
    Structured(StructuredWave),
    Flat(FlatWave),
}

#[derive(Debug, Deserialize)]
struct StructuredWave {
    name: String,
    enemies: Vec<EnemyGroup>,
    spawn_interval: f64,
    #[serde(default = "default_multiplier")]
    health_multiplier: f64,
    #[serde(default = "default_multiplier")]
    spawn_rate_multiplier: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FlatWave {
    wave_name: String,
    #[serde(default)]
    mobs_prefab: Vec<String>,
    mobs_count: u32,
    spawn_rate: f64,
    #[serde(default = "default_multiplier")]
    spawn_rate_multiplier: f64,
    #[serde(default = "default_multiplier")]
    health_multiplier: f64,
}

const fn default_multiplier() -> f64 {
    1.0
}

fn decimal(field: &str, wave: &str, value: f64) -> std::result::Result<Fixed, String> {
    Fixed::checked_from_num(value)
        .ok_or_else(|| format!("wave '{wave}': {field} {value} out of range"))
}

impl WaveEntry {
    fn into_definition(self) -> std::result::Result<WaveDefinition, String> {
        let (name, composition, interval, health, rate) = match self {
            Self::Structured(w) => (
                w.name,
                WaveComposition::Groups(w.enemies),
                w.spawn_interval,
                w.health_multiplier,
                w.spawn_rate_multiplier,
            ),
            Self::Flat(w) => (
                w.wave_name,
                WaveComposition::Pool {
                    archetypes: w.mobs_prefab,
                    count: w.mobs_count,
                },
                w.spawn_rate,
                w.health_multiplier,
                w.spawn_rate_multiplier,
            ),
        };

        let spawn_interval = decimal("spawn interval", &name, interval)?;
        if spawn_interval <= Fixed::ZERO {
            return Err(format!("wave '{name}': spawn interval must be positive"));
        }
        Ok(WaveDefinition {
            spawn_interval,
            health_multiplier: decimal("health multiplier", &name, health)?,
            spawn_rate_multiplier: decimal("spawn rate multiplier", &name, rate)?,
            name,
            composition,
        })
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Ordered wave definitions, read once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaveCatalog {
    waves: Vec<WaveDefinition>,
}

impl WaveCatalog {
    /// Catalog with the given waves.
    #[must_use]
    pub fn new(waves: Vec<WaveDefinition>) -> Self {
        Self { waves }
    }

    /// Catalog with no authored waves; every wave is synthesized.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a JSON wave document.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParseError`] if the document is malformed
    /// or a wave carries an out-of-range or non-positive interval.
    pub fn from_json_str(source: &str, text: &str) -> Result<Self> {
        let parse_error = |message: String| GameError::DataParseError {
            path: source.to_string(),
            message,
        };
        let document: WaveDocument =
            serde_json::from_str(text).map_err(|e| parse_error(e.to_string()))?;
        let waves = document
            .waves
            .into_iter()
            .map(WaveEntry::into_definition)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(parse_error)?;
        Ok(Self { waves })
    }

    /// Number of authored waves.
    #[must_use]
    pub fn len(&self) -> usize {
        self.waves.len()
    }

    /// Whether there are no authored waves.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waves.is_empty()
    }

    /// Authored waves in order.
    #[must_use]
    pub fn waves(&self) -> &[WaveDefinition] {
        &self.waves
    }

    /// Whether `index` falls beyond the authored waves.
    #[must_use]
    pub fn is_synthesized(&self, index: u32) -> bool {
        usize::try_from(index).map_or(true, |i| i >= self.waves.len())
    }

    /// Definition for the zero-based wave `index`: authored if present,
    /// synthesized otherwise.
    #[must_use]
    pub fn definition(&self, index: u32) -> WaveDefinition {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.waves.get(i))
            .cloned()
            .unwrap_or_else(|| self.synthesize(index))
    }

    /// Synthesize the definition for absolute wave `index`.
    ///
    /// With `i = index`:
    /// - count = last authored count + 3i (1 + 3i for an empty catalog),
    ///   or 10 + 3i of the last wave's first archetype when that wave
    ///   uses groups
    /// - interval = max(0.5, first authored interval - 0.05i)
    /// - spawn-rate multiplier = 1 + 0.1i
    /// - health multiplier = 1 + 0.05i
    #[must_use]
    pub fn synthesize(&self, index: u32) -> WaveDefinition {
        let i = Fixed::saturating_from_num(index);
        let hundredths = |n: i32| i.saturating_mul(Fixed::from_num(n)) / Fixed::from_num(100);
        let step = SYNTH_COUNT_STEP.saturating_mul(index);
        let composition = match self.waves.last().map(|w| &w.composition) {
            Some(WaveComposition::Groups(groups)) => {
                let count = SYNTH_GROUP_BASE.saturating_add(step);
                match groups.first() {
                    Some(group) => WaveComposition::Groups(vec![EnemyGroup {
                        archetype: group.archetype.clone(),
                        count,
                    }]),
                    None => WaveComposition::Pool {
                        archetypes: Vec::new(),
                        count,
                    },
                }
            }
            Some(WaveComposition::Pool { count, .. }) => WaveComposition::Pool {
                archetypes: Vec::new(),
                count: count.saturating_add(step),
            },
            None => WaveComposition::Pool {
                archetypes: Vec::new(),
                count: step.saturating_add(1),
            },
        };
        let first_interval = self
            .waves
            .first()
            .map_or(Fixed::from_num(1), |w| w.spawn_interval);

        let spawn_interval = first_interval
            .saturating_sub(hundredths(5))
            .max(MIN_SPAWN_INTERVAL);
        let spawn_rate_multiplier = Fixed::from_num(1).saturating_add(hundredths(10));
        let health_multiplier = Fixed::from_num(1).saturating_add(hundredths(5));

        WaveDefinition {
            name: format!("Wave {}", index.saturating_add(1)),
            composition,
            spawn_interval,
            health_multiplier,
            spawn_rate_multiplier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(value: Fixed, expected: f64) -> bool {
        (value.to_num::<f64>() - expected).abs() < 1e-6
    }

    const THREE_WAVES: &str = r#"{ "waves": [
        { "name": "One", "enemies": [{ "archetype": "slime", "count": 5 }], "spawn_interval": 1.0 },
        { "name": "Two", "enemies": [{ "archetype": "slime", "count": 6 },
                                     { "archetype": "bomber", "count": 2 }],
          "spawn_interval": 0.9, "health_multiplier": 1.5 },
        { "WaveName": "Three", "MobsPrefab": ["sniper", "slime"], "MobsCount": 10,
          "SpawnRate": 0.8, "SpawnRateMultiplier": 1.2, "HealthMultiplier": 2 }
    ] }"#;

    #[test]
    fn test_parse_mixed_forms() {
        let catalog = WaveCatalog::from_json_str("waves.json", THREE_WAVES).unwrap();
        assert_eq!(catalog.len(), 3);

        let two = &catalog.waves()[1];
        assert_eq!(two.composition.total_count(), 8);
        assert!(approx(two.health_multiplier, 1.5));
        assert!(approx(two.spawn_rate_multiplier, 1.0));

        let three = &catalog.waves()[2];
        assert_eq!(three.name, "Three");
        assert_eq!(
            three.composition,
            WaveComposition::Pool {
                archetypes: vec!["sniper".into(), "slime".into()],
                count: 10
            }
        );
        assert!(approx(three.health_multiplier, 2.0));
    }

    #[test]
    fn test_malformed_document_is_error() {
        assert!(WaveCatalog::from_json_str("x", "{ not json").is_err());
        assert!(WaveCatalog::from_json_str("x", r#"{"waves":[{"name":"a"}]}"#).is_err());
        let zero = r#"{"waves":[{"name":"a","enemies":[],"spawn_interval":0}]}"#;
        assert!(WaveCatalog::from_json_str("x", zero).is_err());
    }

    #[test]
    fn test_missing_waves_key_is_empty_catalog() {
        let catalog = WaveCatalog::from_json_str("x", "{}").unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_definition_uses_catalog_then_synthesizes() {
        let catalog = WaveCatalog::from_json_str("waves.json", THREE_WAVES).unwrap();
        assert_eq!(catalog.definition(0).name, "One");
        assert!(!catalog.is_synthesized(2));
        assert!(catalog.is_synthesized(3));

        let synth = catalog.definition(3);
        assert_eq!(synth.composition.total_count(), 10 + 9);
        assert!(approx(synth.spawn_interval, 0.85));
        assert!(approx(synth.spawn_rate_multiplier, 1.3));
        assert!(approx(synth.health_multiplier, 1.15));
        assert_eq!(synth.composition.archetype_names().count(), 0);
    }

    #[test]
    fn test_group_form_tail_uses_fallback_archetype() {
        let catalog = WaveCatalog::new(vec![WaveDefinition {
            name: "Mixed".into(),
            composition: WaveComposition::Groups(vec![
                EnemyGroup { archetype: "bomber".into(), count: 2 },
                EnemyGroup { archetype: "slime".into(), count: 30 },
            ]),
            spawn_interval: Fixed::from_num(1),
            health_multiplier: Fixed::from_num(1),
            spawn_rate_multiplier: Fixed::from_num(1),
        }]);

        let synth = catalog.synthesize(2);
        assert_eq!(
            synth.composition,
            WaveComposition::Groups(vec![EnemyGroup { archetype: "bomber".into(), count: 16 }])
        );
    }

    #[test]
    fn test_interval_floors_at_half_second() {
        let catalog = WaveCatalog::from_json_str("waves.json", THREE_WAVES).unwrap();
        assert_eq!(catalog.synthesize(10).spawn_interval, MIN_SPAWN_INTERVAL);
        assert_eq!(catalog.synthesize(500).spawn_interval, MIN_SPAWN_INTERVAL);
    }

    #[test]
    fn test_empty_catalog_synthesizes_single_enemy_first_wave() {
        let catalog = WaveCatalog::empty();
        let first = catalog.definition(0);
        assert_eq!(first.composition.total_count(), 1);
        assert!(approx(first.spawn_interval, 1.0));
        assert_eq!(catalog.definition(2).composition.total_count(), 7);
    }

    #[test]
    fn test_scaling_formulas() {
        assert_eq!(scaled_count(5, 2), 10);
        assert_eq!(scaled_count(5, 0), 5);
        assert_eq!(scaled_max_health(5, Fixed::from_num(1), 2), 10);
        assert_eq!(scaled_max_health(5, Fixed::from_num(1.15), 3), 17);
        assert_eq!(scaled_max_health(1, Fixed::from_num(0.1), 1), 1);
    }
}
