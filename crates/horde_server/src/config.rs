//! Server configuration.
//!
//! Loaded from a RON file, then overridden by command line flags.
//! Every field has a default, so an empty `()` document is valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use horde_core::config::SimulationConfig;
use horde_core::simulation::TICK_RATE;

use crate::data_loader::read_file;
use crate::error::{ConfigError, ConfigResult};

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Ticks per second of wall-clock pacing; must match the core.
    pub tick_rate: u32,
    /// Capacity of the observer command queue.
    pub command_capacity: usize,
    /// Capacity of the replication fan-out; slower observers lose events.
    pub broadcast_capacity: usize,
    /// Ticks between published world snapshots for late joiners.
    pub snapshot_interval: u64,
    /// Stop after this many ticks even if players are still alive.
    pub max_ticks: Option<u64>,
    /// Wave catalog JSON. `None` means synthesized waves only.
    pub waves_path: Option<PathBuf>,
    /// Archetype registry RON. `None` means the built-in archetypes.
    pub archetypes_path: Option<PathBuf>,
    /// Roster supplied at match start.
    pub players: Vec<String>,
    /// Simulation tunables.
    pub simulation: SimulationConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_rate: TICK_RATE,
            command_capacity: 1000,
            broadcast_capacity: 1024,
            snapshot_interval: u64::from(TICK_RATE),
            max_ticks: None,
            waves_path: None,
            archetypes_path: None,
            players: Vec::new(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parse a RON document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ParseError`] for malformed RON and
    /// [`ConfigError::Invalid`] for out-of-range settings.
    pub fn from_ron_str(path: &str, text: &str) -> ConfigResult<Self> {
        let config: Self = ron::from_str(text).map_err(|e| ConfigError::ParseError {
            path: path.to_string(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a RON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = read_file(path)?;
        let config = Self::from_ron_str(&path.display().to_string(), &text)?;
        tracing::info!(path = %path.display(), "Loaded server config");
        Ok(config)
    }

    /// Reject settings the match loop cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.tick_rate != TICK_RATE {
            // Durations are converted to ticks at the simulation rate.
            return Err(ConfigError::Invalid {
                field: "tick_rate",
                reason: format!("must equal the simulation rate of {TICK_RATE}"),
            });
        }
        if self.command_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "command_capacity",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.broadcast_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "broadcast_capacity",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
