//! # Horde Core
//!
//! Deterministic, authoritative simulation for a cooperative
//! wave-survival match.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO (documents are parsed from strings handed in by the caller)
//! - No system randomness
//! - No floating-point math in the simulation (uses fixed-point)
//!
//! This separation enables:
//! - A headless match server
//! - Authoring tools that share the real parsers
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`waves`] - Wave catalog and the synthesis rule for waves past its end
//! - [`scheduler`] - Wave lifecycle state machine
//! - [`spawn`] / [`arena`] - Spawn point sampling against level geometry
//! - [`archetype`] - Enemy archetype templates
//! - [`ai`] - Enemy behavior state machines
//! - [`combat`] - Damage and healing resolution
//! - [`player`] - Players, movement and the roster
//! - [`replication`] - Events and commands crossing the authority boundary
//! - [`timers`] - Tick-based deferred actions
//! - [`simulation`] - The match authority tying it all together
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ai;
pub mod archetype;
pub mod arena;
pub mod combat;
pub mod components;
pub mod config;
pub mod error;
pub mod math;
pub mod player;
pub mod replication;
pub mod scheduler;
pub mod simulation;
pub mod spawn;
pub mod timers;
pub mod waves;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::ai::{EnemyAction, EnemyBrain, EnemyState};
    pub use crate::archetype::{ArchetypeKind, ArchetypeRegistry, ArchetypeTemplate};
    pub use crate::arena::{Arena, Platform, SpawnSurface};
    pub use crate::combat::CombatEvent;
    pub use crate::components::*;
    pub use crate::config::SimulationConfig;
    pub use crate::error::{GameError, Result};
    pub use crate::math::{Fixed, Vec3Fixed};
    pub use crate::player::{Player, PlayerRegistry, PlayerStats, PlayerTag};
    pub use crate::replication::{
        MatchSummary, ObserverCommand, PlayerKills, ReplicationEvent, ReplicationHub,
        StateObserver,
    };
    pub use crate::scheduler::{SchedulerAction, SchedulerPhase, WaveScheduler};
    pub use crate::simulation::{Simulation, TickEvents, WorldSnapshot, TICK_RATE};
    pub use crate::spawn::SpawnValidator;
    pub use crate::waves::{EnemyGroup, WaveCatalog, WaveComposition, WaveDefinition};
}
