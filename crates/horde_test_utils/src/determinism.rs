//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the match authority
//! produces identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! A replayed match must be bit-for-bit identical to the original.
//! Sources of non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`horde_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Entities live in `BTreeMap`s and are visited in id order.
//!
//! - **System randomness**: Spawn angles and archetype picks come from a
//!   single seeded `ChaCha8Rng` owned by the simulation.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual module determinism (scheduler, spawn, AI)
//! 2. **Property tests**: Random command streams still replay identically
//! 3. **Integration tests**: Full matches are reproducible
//! 4. **Parallel tests**: Running N matches on threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use horde_core::replication::ObserverCommand;
use horde_core::simulation::{Simulation, WorldSnapshot};

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a state machine multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `ticks` - Number of steps per run
/// * `setup` - Function to create initial state
/// * `step` - Function to advance state by one tick
/// * `hash` - Function to compute state hash
///
/// # Example
///
/// ```
/// use horde_test_utils::determinism::verify_determinism;
/// use horde_test_utils::fixtures::solo_match;
///
/// let result = verify_determinism(
///     3,
///     100,
///     || solo_match(9),
///     |sim| { sim.tick(); },
///     |sim| sim.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run a match twice with identical setup and compare final hashes.
pub fn verify_simulation_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |sim| {
            sim.tick();
        },
        Simulation::state_hash,
    )
    .is_deterministic
}

/// Replay a command script against two fresh matches.
///
/// `script` pairs a tick with the commands applied just before it.
/// Commands a match rejects are skipped in both runs alike.
pub fn verify_scripted_determinism<F>(
    setup_fn: F,
    script: &[(u64, ObserverCommand)],
    num_ticks: u64,
) -> DeterminismResult
where
    F: Fn() -> Simulation,
{
    verify_determinism(
        2,
        1,
        || {
            let mut sim = setup_fn();
            for tick in 1..=num_ticks {
                for (_, command) in script.iter().filter(|(at, _)| *at == tick) {
                    let _ = sim.apply_command(*command);
                }
                sim.tick();
            }
            sim
        },
        |_| {},
        Simulation::state_hash,
    )
}

/// Run matches on scoped threads and collect final hashes.
///
/// Catches non-determinism that only shows up under thread scheduling
/// or memory layout differences.
///
/// # Panics
///
/// Panics if a simulation thread panics.
pub fn run_parallel_simulations<F>(setup_fn: F, num_sims: usize, num_ticks: u64) -> Vec<u64>
where
    F: Fn() -> Simulation + Sync,
{
    thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    for _ in 0..num_ticks {
                        sim.tick();
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread panicked"))
            .collect()
    })
}

/// Compare two runs tick by tick, finding the first divergence.
///
/// Returns `None` if the runs agree throughout, `Some(tick)` otherwise.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        sim1.tick();
        sim2.tick();

        if sim1.state_hash() != sim2.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Verify that a world snapshot survives a bincode round trip unchanged.
pub fn verify_snapshot_roundtrip<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let mut sim = setup_fn();
    for _ in 0..num_ticks {
        sim.tick();
    }

    let snapshot = sim.snapshot();
    let Ok(bytes) = snapshot.encode() else {
        return false;
    };
    WorldSnapshot::decode(&bytes).is_ok_and(|restored| {
        compute_hash(&restored) == compute_hash(&snapshot) && restored == snapshot
    })
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for determinism and combat testing.
pub mod strategies {
    use horde_core::components::EntityId;
    use horde_core::math::{Fixed, Vec3Fixed};
    use horde_core::replication::ObserverCommand;
    use proptest::prelude::*;

    /// A ground-plane coordinate within a typical arena.
    pub fn arb_fixed_coordinate() -> impl Strategy<Value = Fixed> {
        (-20i32..=20i32).prop_map(Fixed::from_num)
    }

    /// A point on the ground plane (y = 0).
    pub fn arb_ground_point() -> impl Strategy<Value = Vec3Fixed> {
        (arb_fixed_coordinate(), arb_fixed_coordinate())
            .prop_map(|(x, z)| Vec3Fixed::new(x, Fixed::ZERO, z))
    }

    /// A movement direction, possibly zero.
    pub fn arb_direction() -> impl Strategy<Value = Vec3Fixed> {
        (-1i32..=1i32, -1i32..=1i32).prop_map(|(x, z)| Vec3Fixed::from_ints(x, 0, z))
    }

    /// Any command for one of `players`.
    pub fn arb_command(players: Vec<EntityId>) -> impl Strategy<Value = ObserverCommand> {
        let pick = proptest::sample::select(players);
        (pick, 0u8..3, arb_direction(), arb_ground_point()).prop_map(
            |(player, kind, direction, target_position)| match kind {
                0 => ObserverCommand::Move { player, direction },
                1 => ObserverCommand::Jump { player },
                _ => ObserverCommand::Attack {
                    player,
                    target_position,
                },
            },
        )
    }

    /// A tick-stamped command script over `ticks` ticks.
    pub fn arb_command_script(
        players: Vec<EntityId>,
        ticks: u64,
        max_len: usize,
    ) -> impl Strategy<Value = Vec<(u64, ObserverCommand)>> {
        proptest::collection::vec((1..=ticks, arb_command(players)), 0..max_len)
    }

    /// Health values (1-1000).
    pub fn arb_health() -> impl Strategy<Value = u32> {
        1u32..1000u32
    }

    /// Damage values (0-100).
    pub fn arb_damage() -> impl Strategy<Value = u32> {
        0u32..100u32
    }

    /// Positive wave multipliers in hundredths (0.25 to 4.00).
    pub fn arb_multiplier() -> impl Strategy<Value = Fixed> {
        (25i32..=400i32).prop_map(|n| Fixed::from_num(n) / Fixed::from_num(100))
    }
}
