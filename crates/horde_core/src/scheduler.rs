//! Wave scheduler.
//!
//! Drives the match through
//! `WaitingToStart -> Spawning -> Idle -> Spawning -> ... -> EndOfMatch`.
//! The scheduler owns pacing only: it decides *when* a wave starts and
//! *when* each spawn is due, and emits [`SchedulerAction`]s. The
//! authority turns spawn orders into enemies (choosing a player,
//! validating a point, scaling health).
//!
//! All deadlines are absolute ticks checked against the tick the
//! authority passes to [`WaveScheduler::update`].

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, seconds_to_ticks, Fixed};
use crate::waves::{WaveCatalog, WaveComposition, WaveDefinition};

/// Scheduler phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchedulerPhase {
    /// Warm-up; no wave may start before `ready_at` or without a roster.
    WaitingToStart {
        /// First tick a wave may start.
        ready_at: u64,
    },
    /// A wave is spawning.
    Spawning,
    /// Between waves.
    Idle {
        /// First tick the next wave may start.
        resume_at: u64,
    },
    /// Terminal: every player is down.
    EndOfMatch,
}

/// One entry in a wave's spawn queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpawnSlot {
    /// Spawn this archetype.
    Archetype(String),
    /// Pick uniformly from these names; empty means any known archetype.
    AnyOf(Vec<String>),
}

/// Request to spawn one enemy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpawnOrder {
    /// Wave the enemy belongs to.
    pub wave_index: u32,
    /// Which archetype to spawn.
    pub slot: SpawnSlot,
    /// Wave health multiplier.
    #[serde(with = "fixed_serde")]
    pub health_multiplier: Fixed,
}

/// Output of one scheduler update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulerAction {
    /// A wave began.
    WaveStarted {
        /// Zero-based index.
        index: u32,
        /// Wave name.
        name: String,
        /// Enemies it will spawn.
        total: u32,
    },
    /// Spawn one enemy now.
    Spawn(SpawnOrder),
    /// The wave's last spawn interval elapsed.
    WaveCompleted {
        /// Zero-based index.
        index: u32,
    },
    /// The wave stopped early because no players were alive.
    WaveAborted {
        /// Zero-based index.
        index: u32,
        /// Enemies spawned before the abort.
        spawned: u32,
    },
    /// The match is over.
    MatchEnded {
        /// Waves started during the match.
        waves_started: u32,
    },
}

/// The wave currently spawning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActiveWave {
    /// Zero-based index.
    pub index: u32,
    /// Definition being spawned.
    pub definition: WaveDefinition,
    /// Spawns still to issue.
    pub queue: VecDeque<SpawnSlot>,
    /// Spawns issued so far.
    pub spawned: u32,
    /// Tick the next spawn (or completion) is due.
    pub next_due: u64,
    /// Ticks between spawns.
    pub interval_ticks: u64,
}

/// Paces waves against the tick clock.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WaveScheduler {
    phase: SchedulerPhase,
    next_index: u32,
    active: Option<ActiveWave>,
    rest_ticks: u64,
    tick_rate: u32,
}

impl WaveScheduler {
    /// Create a scheduler that may start its first wave on `ready_at`.
    ///
    /// `rest_ticks` is an optional pause between a wave completing and
    /// the next one starting.
    #[must_use]
    pub fn new(ready_at: u64, rest_ticks: u64, tick_rate: u32) -> Self {
        Self {
            phase: SchedulerPhase::WaitingToStart { ready_at },
            next_index: 0,
            active: None,
            rest_ticks,
            tick_rate,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> SchedulerPhase {
        self.phase
    }

    /// Index of the most recently started wave.
    #[must_use]
    pub fn current_wave(&self) -> Option<u32> {
        self.next_index.checked_sub(1)
    }

    /// Number of waves started so far.
    #[must_use]
    pub const fn waves_started(&self) -> u32 {
        self.next_index
    }

    /// The wave currently spawning.
    #[must_use]
    pub const fn active_wave(&self) -> Option<&ActiveWave> {
        self.active.as_ref()
    }

    /// Whether a wave is spawning.
    #[must_use]
    pub fn is_spawning(&self) -> bool {
        self.phase == SchedulerPhase::Spawning
    }

    /// Whether the match has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.phase == SchedulerPhase::EndOfMatch
    }

    /// Advance the scheduler to tick `now`.
    ///
    /// `living_players` is sampled by the caller every tick; `roster_size`
    /// counts connected players, dead or alive. At most one spawn is
    /// issued per call.
    pub fn update(
        &mut self,
        now: u64,
        living_players: usize,
        roster_size: usize,
        catalog: &WaveCatalog,
    ) -> Vec<SchedulerAction> {
        let mut actions = Vec::new();

        if let SchedulerPhase::WaitingToStart { ready_at } = self.phase {
            if now < ready_at || roster_size == 0 {
                return actions;
            }
            tracing::info!(tick = now, players = roster_size, "Warm-up over");
            self.phase = SchedulerPhase::Idle { resume_at: now };
        }

        if let SchedulerPhase::Idle { resume_at } = self.phase {
            if living_players == 0 {
                self.end_match(now, &mut actions);
                return actions;
            }
            if now < resume_at {
                return actions;
            }
            self.start_wave(now, living_players, catalog, &mut actions);
        }

        if self.phase == SchedulerPhase::Spawning {
            self.advance_spawning(now, living_players, &mut actions);
        }

        actions
    }

    fn start_wave(
        &mut self,
        now: u64,
        living_players: usize,
        catalog: &WaveCatalog,
        actions: &mut Vec<SchedulerAction>,
    ) {
        let index = self.next_index;
        self.next_index = self.next_index.saturating_add(1);
        let definition = catalog.definition(index);
        let queue = build_queue(&definition.composition, living_players);
        let total = u32::try_from(queue.len()).unwrap_or(u32::MAX);
        let interval_ticks = seconds_to_ticks(definition.spawn_interval, self.tick_rate);

        tracing::info!(
            tick = now,
            wave = index,
            name = %definition.name,
            total,
            interval_ticks,
            synthesized = catalog.is_synthesized(index),
            "Wave started"
        );
        actions.push(SchedulerAction::WaveStarted {
            index,
            name: definition.name.clone(),
            total,
        });

        self.active = Some(ActiveWave {
            index,
            definition,
            queue,
            spawned: 0,
            next_due: now,
            interval_ticks,
        });
        self.phase = SchedulerPhase::Spawning;
    }

    fn advance_spawning(
        &mut self,
        now: u64,
        living_players: usize,
        actions: &mut Vec<SchedulerAction>,
    ) {
        let Some(wave) = self.active.as_mut() else {
            self.phase = SchedulerPhase::Idle { resume_at: now };
            return;
        };

        if living_players == 0 {
            tracing::info!(tick = now, wave = wave.index, spawned = wave.spawned, "Wave aborted");
            actions.push(SchedulerAction::WaveAborted {
                index: wave.index,
                spawned: wave.spawned,
            });
            self.active = None;
            self.end_match(now, actions);
            return;
        }

        if now < wave.next_due {
            return;
        }

        match wave.queue.pop_front() {
            Some(slot) => {
                wave.spawned += 1;
                wave.next_due = now + wave.interval_ticks;
                actions.push(SchedulerAction::Spawn(SpawnOrder {
                    wave_index: wave.index,
                    slot,
                    health_multiplier: wave.definition.health_multiplier,
                }));
            }
            None => {
                let index = wave.index;
                tracing::info!(tick = now, wave = index, "Wave completed");
                actions.push(SchedulerAction::WaveCompleted { index });
                self.active = None;
                self.phase = SchedulerPhase::Idle {
                    resume_at: now + self.rest_ticks,
                };
            }
        }
    }

    fn end_match(&mut self, now: u64, actions: &mut Vec<SchedulerAction>) {
        tracing::info!(tick = now, waves = self.next_index, "No players alive, match over");
        self.phase = SchedulerPhase::EndOfMatch;
        actions.push(SchedulerAction::MatchEnded {
            waves_started: self.next_index,
        });
    }
}

/// Expand a composition into its spawn queue for `players` living players.
fn build_queue(composition: &WaveComposition, players: usize) -> VecDeque<SpawnSlot> {
    let mut queue = VecDeque::new();
    match composition {
        WaveComposition::Groups(groups) => {
            for group in groups {
                let count = crate::waves::scaled_count(group.count, players);
                for _ in 0..count {
                    queue.push_back(SpawnSlot::Archetype(group.archetype.clone()));
                }
            }
        }
        WaveComposition::Pool { archetypes, count } => {
            let count = crate::waves::scaled_count(*count, players);
            for _ in 0..count {
                queue.push_back(SpawnSlot::AnyOf(archetypes.clone()));
            }
        }
    }
    queue
}
