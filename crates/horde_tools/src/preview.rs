//! Wave plan preview.
//!
//! Shows what the scheduler will do for the first N waves with P
//! living players: enemy counts, pacing, and the max health each
//! archetype would spawn with.

use std::fmt::Write;

use serde::Serialize;

use horde_core::archetype::ArchetypeRegistry;
use horde_core::math::seconds_to_ticks;
use horde_core::simulation::TICK_RATE;
use horde_core::waves::{scaled_count, scaled_max_health, WaveCatalog, WaveComposition};

/// One wave of the plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaveRow {
    /// Zero-based wave index.
    pub index: u32,
    /// Display name.
    pub name: String,
    /// Generated past the end of the catalog.
    pub synthesized: bool,
    /// Enemies spawned with the given player count.
    pub enemies: u32,
    /// Seconds between spawns.
    pub spawn_interval: f64,
    /// Ticks from the first spawn to wave completion.
    pub duration_ticks: u64,
    /// Health multiplier.
    pub health_multiplier: f64,
    /// `(archetype, max health)` for each archetype the wave can spawn.
    pub max_health: Vec<(String, u32)>,
}

/// Build the plan for `waves` waves and `players` living players.
#[must_use]
pub fn plan(catalog: &WaveCatalog, registry: &ArchetypeRegistry, waves: u32, players: usize) -> Vec<WaveRow> {
    (0..waves)
        .map(|index| {
            let definition = catalog.definition(index);
            let enemies = match &definition.composition {
                WaveComposition::Groups(groups) => groups.iter().map(|g| scaled_count(g.count, players)).sum(),
                WaveComposition::Pool { count, .. } => scaled_count(*count, players),
            };

            let names: Vec<String> = match &definition.composition {
                WaveComposition::Pool { archetypes, .. } if archetypes.is_empty() => {
                    registry.names().map(str::to_string).collect()
                }
                composition => composition.archetype_names().map(str::to_string).collect(),
            };
            let max_health = names
                .into_iter()
                .filter_map(|name| {
                    let template = registry.get(&name)?;
                    let health = scaled_max_health(template.max_health, definition.health_multiplier, players.max(1));
                    Some((name, health))
                })
                .collect();

            let interval = seconds_to_ticks(definition.spawn_interval, TICK_RATE);
            WaveRow {
                index,
                synthesized: catalog.is_synthesized(index),
                enemies,
                spawn_interval: definition.spawn_interval.to_num(),
                duration_ticks: interval * u64::from(enemies),
                health_multiplier: definition.health_multiplier.to_num(),
                max_health,
                name: definition.name,
            }
        })
        .collect()
}

/// Render the plan as a plain-text table.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn render_table(rows: &[WaveRow]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>4}  {:<20} {:>7} {:>9} {:>8} {:>6}  max health",
        "#", "name", "enemies", "interval", "duration", "hp x"
    );
    for row in rows {
        let health = row
            .max_health
            .iter()
            .map(|(name, hp)| format!("{name}={hp}"))
            .collect::<Vec<_>>()
            .join(" ");
        let marker = if row.synthesized { "*" } else { " " };
        let _ = writeln!(
            out,
            "{:>3}{marker}  {:<20} {:>7} {:>8.2}s {:>7.1}s {:>6.2}  {health}",
            row.index + 1,
            row.name,
            row.enemies,
            row.spawn_interval,
            row.duration_ticks as f64 / f64::from(TICK_RATE),
            row.health_multiplier,
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use horde_test_utils::fixtures::wave;

    #[test]
    fn test_plan_scales_with_players() {
        let catalog = WaveCatalog::new(vec![wave("Opening", "slime", 5, 1.0)]);
        let rows = plan(&catalog, &ArchetypeRegistry::builtin(), 1, 2);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].enemies, 10);
        assert_eq!(rows[0].duration_ticks, 200);
        assert_eq!(rows[0].max_health, vec![("slime".to_string(), 10)]);
        assert!(!rows[0].synthesized);
    }

    #[test]
    fn test_plan_continues_past_catalog() {
        let catalog = WaveCatalog::new(vec![wave("Opening", "slime", 5, 1.0)]);
        let rows = plan(&catalog, &ArchetypeRegistry::builtin(), 4, 1);

        assert!(rows[3].synthesized);
        assert_eq!(rows[3].name, "Wave 4");
        // A group-form tail continues with its first archetype.
        assert_eq!(rows[3].enemies, 10 + 9);
        assert!((rows[3].spawn_interval - 0.85).abs() < 1e-6);
        assert_eq!(rows[3].max_health.len(), 1);
    }

    #[test]
    fn test_synthesized_pool_lists_every_archetype() {
        let rows = plan(&WaveCatalog::empty(), &ArchetypeRegistry::builtin(), 2, 1);
        assert_eq!(rows[1].enemies, 1 + 3);
        assert_eq!(rows[1].max_health.len(), 3);
    }

    #[test]
    fn test_table_marks_synthesized_waves() {
        let rows = plan(&WaveCatalog::empty(), &ArchetypeRegistry::builtin(), 2, 1);
        let table = render_table(&rows);
        assert_eq!(table.lines().count(), 3);
        assert!(table.lines().nth(1).unwrap().starts_with("  1*"));
    }
}
