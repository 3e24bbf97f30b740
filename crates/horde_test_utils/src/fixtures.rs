//! Test fixtures and helpers.
//!
//! Pre-built matches, catalogs and archetypes for consistent testing.

use fixed::types::I32F32;
use horde_core::archetype::{ArchetypeKind, ArchetypeRegistry, ArchetypeTemplate};
use horde_core::config::SimulationConfig;
use horde_core::math::Vec3Fixed;
use horde_core::simulation::Simulation;
use horde_core::waves::{EnemyGroup, WaveCatalog, WaveComposition, WaveDefinition};

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// A ground-plane point from integer coordinates.
#[must_use]
pub fn ground(x: i32, z: i32) -> Vec3Fixed {
    Vec3Fixed::from_ints(x, 0, z)
}

/// A single-group wave.
#[must_use]
pub fn wave(name: &str, archetype: &str, count: u32, interval: f64) -> WaveDefinition {
    WaveDefinition {
        name: name.to_string(),
        composition: WaveComposition::Groups(vec![EnemyGroup {
            archetype: archetype.to_string(),
            count,
        }]),
        spawn_interval: fixed_f(interval),
        health_multiplier: fixed(1),
        spawn_rate_multiplier: fixed(1),
    }
}

/// Three authored waves: slimes, then bombers, then snipers.
#[must_use]
pub fn sample_catalog() -> WaveCatalog {
    WaveCatalog::new(vec![
        wave("Wave 1", "slime", 3, 1.0),
        wave("Wave 2", "bomber", 2, 1.0),
        wave("Wave 3", "sniper", 2, 0.5),
    ])
}

/// A melee archetype that never moves, for aiming tests.
#[must_use]
pub fn statue(max_health: u32) -> ArchetypeTemplate {
    ArchetypeTemplate::new("statue", ArchetypeKind::Melee)
        .with_max_health(max_health)
        .with_speed(fixed(0))
        .with_stopping_distance(fixed(0))
}

/// Built-in archetypes plus [`statue`].
#[must_use]
pub fn registry_with_statue() -> ArchetypeRegistry {
    let mut registry = ArchetypeRegistry::builtin();
    registry.insert(statue(5));
    registry
}

/// Config for hand-driven tests: no auto-attack, no waves.
#[must_use]
pub fn quiet_config(seed: u64) -> SimulationConfig {
    let mut config = SimulationConfig::with_seed(seed);
    config.player.auto_attack = false;
    config.warmup_seconds = fixed(1000);
    config
}

/// One player against the sample catalog.
#[must_use]
pub fn solo_match(seed: u64) -> Simulation {
    squad_match(seed, 1)
}

/// `players` players against the sample catalog.
#[must_use]
pub fn squad_match(seed: u64, players: usize) -> Simulation {
    let mut sim = Simulation::new(
        SimulationConfig::with_seed(seed),
        sample_catalog(),
        &ArchetypeRegistry::builtin(),
    );
    for n in 0..players {
        sim.add_player(format!("player{}", n + 1));
    }
    sim
}

/// A hand-driven match with `players` players and the statue archetype.
#[must_use]
pub fn quiet_match(players: usize) -> Simulation {
    let mut sim = Simulation::new(quiet_config(1), WaveCatalog::empty(), &registry_with_statue());
    for n in 0..players {
        sim.add_player(format!("player{}", n + 1));
    }
    sim
}
