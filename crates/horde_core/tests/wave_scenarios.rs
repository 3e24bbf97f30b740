//! Wave lifecycle scenarios driven through the full simulation.

use horde_core::prelude::*;
use horde_core::scheduler::SchedulerAction;
use horde_core::waves::MIN_SPAWN_INTERVAL;
use horde_test_utils::fixtures::{fixed, fixed_f, sample_catalog, wave};
use proptest::prelude::*;

fn run_until<F>(sim: &mut Simulation, max_ticks: u64, mut done: F) -> Vec<TickEvents>
where
    F: FnMut(&TickEvents) -> bool,
{
    let mut all = Vec::new();
    for _ in 0..max_ticks {
        let events = sim.tick();
        let stop = done(&events);
        all.push(events);
        if stop {
            break;
        }
    }
    all
}

fn wave_starts(events: &[TickEvents]) -> Vec<(u64, u32, u32)> {
    events
        .iter()
        .flat_map(|e| {
            e.scheduler.iter().filter_map(move |a| match a {
                SchedulerAction::WaveStarted { index, total, .. } => Some((e.tick, *index, *total)),
                _ => None,
            })
        })
        .collect()
}

fn peaceful_config() -> SimulationConfig {
    let mut config = SimulationConfig::with_seed(11);
    config.player.auto_attack = false;
    config.player.max_health = 500;
    config
}

// =============================================================================
// Start conditions
// =============================================================================

#[test]
fn no_wave_without_players() {
    let mut sim = Simulation::new(peaceful_config(), sample_catalog(), &ArchetypeRegistry::builtin());
    let events = run_until(&mut sim, 200, |_| false);
    assert!(wave_starts(&events).is_empty());
    assert_eq!(sim.scheduler().current_wave(), None);
}

#[test]
fn first_wave_starts_after_warmup_and_spawns_immediately() {
    let mut sim = Simulation::new(peaceful_config(), sample_catalog(), &ArchetypeRegistry::builtin());
    sim.add_player("ada");

    let events = run_until(&mut sim, 100, |e| !e.spawned.is_empty());
    let last = events.last().unwrap();
    assert_eq!(last.tick, 40);
    assert_eq!(wave_starts(&events), vec![(40, 0, 3)]);
    assert_eq!(last.spawned.len(), 1);
    assert!(last
        .replication
        .iter()
        .any(|r| matches!(r, ReplicationEvent::WaveStarted { index: 0, .. })));
}

// =============================================================================
// Player scaling
// =============================================================================

#[test]
fn enemy_count_scales_with_living_players() {
    let catalog = WaveCatalog::new(vec![wave("Only", "slime", 2, 0.5)]);
    let mut sim = Simulation::new(peaceful_config(), catalog, &ArchetypeRegistry::builtin());
    sim.add_player("a");
    sim.add_player("b");
    sim.add_player("c");

    let events = run_until(&mut sim, 200, |e| {
        e.scheduler
            .iter()
            .any(|a| matches!(a, SchedulerAction::WaveCompleted { index: 0 }))
    });
    assert_eq!(wave_starts(&events), vec![(40, 0, 6)]);
    let spawned: usize = events.iter().map(|e| e.spawned.len()).sum();
    assert_eq!(spawned, 6);
}

#[test]
fn enemy_health_scales_with_multiplier_and_players() {
    let mut definition = wave("Tough", "slime", 1, 1.0);
    definition.health_multiplier = fixed_f(1.5);
    let mut sim = Simulation::new(
        peaceful_config(),
        WaveCatalog::new(vec![definition]),
        &ArchetypeRegistry::builtin(),
    );
    sim.add_player("a");
    sim.add_player("b");

    let events = run_until(&mut sim, 100, |e| !e.spawned.is_empty());
    let id = events.last().unwrap().spawned[0];
    // slime 5 hp * 1.5 * 2 players
    assert_eq!(sim.enemy(id).unwrap().health.max, 15);
}

#[test]
fn five_slimes_with_two_players() {
    let catalog = WaveCatalog::new(vec![wave("Pair", "slime", 5, 1.0)]);
    let mut sim = Simulation::new(peaceful_config(), catalog, &ArchetypeRegistry::builtin());
    sim.add_player("a");
    sim.add_player("b");

    let mut spawn_ticks = Vec::new();
    let mut max_healths = Vec::new();
    for _ in 0..400 {
        let events = sim.tick();
        for id in &events.spawned {
            spawn_ticks.push(events.tick);
            max_healths.push(sim.enemy(*id).unwrap().health.max);
        }
        let completed = events
            .scheduler
            .iter()
            .any(|a| matches!(a, SchedulerAction::WaveCompleted { index: 0 }));
        if completed {
            break;
        }
    }

    // 5 * 2 players, one per second, each at slime base health * 2.
    let expected: Vec<u64> = (0..10).map(|k| 40 + 20 * k).collect();
    assert_eq!(spawn_ticks, expected);
    assert_eq!(max_healths, vec![10; 10]);
}

#[test]
fn spawn_interval_paces_spawns() {
    let catalog = WaveCatalog::new(vec![wave("Paced", "slime", 3, 0.5)]);
    let mut sim = Simulation::new(peaceful_config(), catalog, &ArchetypeRegistry::builtin());
    sim.add_player("a");

    let events = run_until(&mut sim, 200, |e| {
        e.scheduler
            .iter()
            .any(|a| matches!(a, SchedulerAction::WaveCompleted { .. }))
    });
    let spawn_ticks: Vec<u64> = events
        .iter()
        .filter(|e| !e.spawned.is_empty())
        .map(|e| e.tick)
        .collect();
    assert_eq!(spawn_ticks, vec![40, 50, 60]);
    assert_eq!(events.last().unwrap().tick, 70);
}

// =============================================================================
// Synthesis past the catalog
// =============================================================================

#[test]
fn synthesized_waves_follow_the_catalog() {
    let catalog = WaveCatalog::new(vec![WaveDefinition {
        composition: WaveComposition::Pool {
            archetypes: vec!["slime".to_string()],
            count: 1,
        },
        ..wave("Only", "slime", 1, 1.0)
    }]);
    let mut sim = Simulation::new(peaceful_config(), catalog, &ArchetypeRegistry::builtin());
    sim.add_player("a");

    let events = run_until(&mut sim, 2_000, |e| {
        e.scheduler
            .iter()
            .any(|a| matches!(a, SchedulerAction::WaveStarted { index: 2, .. }))
    });
    let starts = wave_starts(&events);
    assert_eq!(starts.len(), 3);
    // Synthesized counts: last total + 3 * index.
    assert_eq!(starts[1].2, 1 + 3);
    assert_eq!(starts[2].2, 1 + 6);
    assert!(sim.catalog().is_synthesized(2));

    let synthesized = sim.catalog().definition(2);
    assert_eq!(synthesized.name, "Wave 3");
    assert!((synthesized.spawn_interval - fixed_f(0.9)).abs() < fixed_f(0.001));
}

proptest! {
    #[test]
    fn synthesized_interval_is_floored_and_non_increasing(base_hundredths in 50i32..500, index in 0u32..2_000) {
        let base = Fixed::from_num(base_hundredths) / Fixed::from_num(100);
        let catalog = WaveCatalog::new(vec![WaveDefinition {
            spawn_interval: base,
            ..wave("Only", "slime", 1, 1.0)
        }]);

        let here = catalog.synthesize(index).spawn_interval;
        let next = catalog.synthesize(index + 1).spawn_interval;
        prop_assert!(here >= MIN_SPAWN_INTERVAL);
        prop_assert!(next <= here);

        let expected = (base.to_num::<f64>() - 0.05 * f64::from(index)).max(0.5);
        prop_assert!((here.to_num::<f64>() - expected).abs() < 1e-6);
    }
}

#[test]
fn rest_period_delays_next_wave() {
    let mut config = peaceful_config();
    config.wave_rest_seconds = fixed(3);
    let catalog = WaveCatalog::new(vec![wave("One", "slime", 1, 1.0), wave("Two", "slime", 1, 1.0)]);
    let mut sim = Simulation::new(config, catalog, &ArchetypeRegistry::builtin());
    sim.add_player("a");

    let events = run_until(&mut sim, 400, |e| {
        e.scheduler
            .iter()
            .any(|a| matches!(a, SchedulerAction::WaveStarted { index: 1, .. }))
    });
    // Wave 0 spawns at 40, completes at 60, then rests 60 ticks.
    assert_eq!(wave_starts(&events), vec![(40, 0, 1), (120, 1, 1)]);
}

// =============================================================================
// End of match
// =============================================================================

#[test]
fn wipe_ends_match_with_summary() {
    let catalog = WaveCatalog::new(vec![wave("Long", "slime", 50, 1.0)]);
    let mut sim = Simulation::new(peaceful_config(), catalog, &ArchetypeRegistry::builtin());
    let a = sim.add_player("a");
    let b = sim.add_player("b");

    run_until(&mut sim, 100, |e| e.tick == 60);
    sim.hurt_player(a, 100_000, None).unwrap();
    sim.hurt_player(b, 100_000, None).unwrap();

    let events = sim.tick();
    assert_eq!(
        events.scheduler,
        vec![
            SchedulerAction::WaveAborted { index: 0, spawned: 2 },
            SchedulerAction::MatchEnded { waves_started: 1 },
        ]
    );
    assert!(sim.is_match_over());

    let summary = sim.match_summary().unwrap();
    assert_eq!(summary.wave_reached, 1);
    assert_eq!(summary.kills.len(), 2);
    assert!(events
        .replication
        .iter()
        .any(|r| matches!(r, ReplicationEvent::MatchEnded { .. })));

    // Nothing spawns after the end.
    let after = run_until(&mut sim, 100, |_| false);
    assert!(after.iter().all(|e| e.spawned.is_empty() && e.scheduler.is_empty()));
}

#[test]
fn wipe_between_waves_ends_match() {
    let mut config = peaceful_config();
    config.wave_rest_seconds = fixed(10);
    let catalog = WaveCatalog::new(vec![wave("Short", "slime", 1, 0.5)]);
    let mut sim = Simulation::new(config, catalog, &ArchetypeRegistry::builtin());
    let a = sim.add_player("a");

    run_until(&mut sim, 100, |e| {
        e.scheduler
            .iter()
            .any(|a| matches!(a, SchedulerAction::WaveCompleted { .. }))
    });
    sim.hurt_player(a, 100_000, None).unwrap();
    let events = sim.tick();
    assert_eq!(
        events.scheduler,
        vec![SchedulerAction::MatchEnded { waves_started: 1 }]
    );
}
