//! Simulation benchmarks for horde_core.
//!
//! Run with: `cargo bench -p horde_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use horde_core::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn crowded_match(players: usize, enemies: i32) -> Simulation {
    let mut config = SimulationConfig::with_seed(1);
    config.warmup_seconds = Fixed::from_num(1000);
    let mut sim = Simulation::new(config, WaveCatalog::empty(), &ArchetypeRegistry::builtin());
    for n in 0..players {
        sim.add_player(format!("p{n}"));
    }
    let names = ["slime", "sniper", "bomber"];
    for i in 0..enemies {
        let name = names[usize::try_from(i).unwrap_or(0) % names.len()];
        let position = Vec3Fixed::from_ints(i % 30 - 15, 0, i / 30 - 15);
        let _ = sim.spawn_enemy(name, position, Fixed::from_num(100));
    }
    sim
}

/// Runs simulation benchmarks for the horde_core crate.
pub fn simulation_benchmark(c: &mut Criterion) {
    c.bench_function("tick_4_players_200_enemies", |b| {
        b.iter_batched(
            || crowded_match(4, 200),
            |mut sim| {
                for _ in 0..20 {
                    black_box(sim.tick());
                }
            },
            BatchSize::SmallInput,
        );
    });

    c.bench_function("state_hash_200_enemies", |b| {
        let sim = crowded_match(4, 200);
        b.iter(|| black_box(sim.state_hash()));
    });

    c.bench_function("find_spawn_point", |b| {
        let validator = SpawnValidator::default();
        let arena = Arena::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        b.iter(|| validator.find_spawn_point(black_box(Vec3Fixed::ZERO), &arena, &mut rng));
    });

    c.bench_function("synthesize_wave_100", |b| {
        let catalog = WaveCatalog::empty();
        b.iter(|| catalog.synthesize(black_box(100)));
    });
}

criterion_group!(benches, simulation_benchmark);
criterion_main!(benches);
