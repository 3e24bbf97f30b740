//! The match loop.
//!
//! [`MatchServer::run`] owns the [`Simulation`] and drives it on a
//! fixed interval. Each tick it:
//!
//! 1. drains queued commands (reliable, in arrival order)
//! 2. advances the simulation
//! 3. publishes a fresh snapshot every `snapshot_interval` ticks
//!
//! Replication events leave through the [`BroadcastObserver`] attached
//! to the simulation. Observers talk to the loop only through a
//! [`MatchHandle`].

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{interval, Duration, MissedTickBehavior};

use horde_core::components::EntityId;
use horde_core::replication::{MatchSummary, ObserverCommand};
use horde_core::simulation::{Simulation, WorldSnapshot};

use crate::broadcast::{BroadcastObserver, TickedEvent};
use crate::config::ServerConfig;
use crate::data_loader::{load_archetypes, load_wave_catalog, report_unknown_archetypes};
use crate::error::ServerError;

/// Requests from observers to the match loop.
#[derive(Debug)]
pub enum ServerCommand {
    /// Add a player; the new id is sent back.
    Join {
        /// Display name.
        name: String,
        /// Reply channel for the assigned id.
        reply: oneshot::Sender<EntityId>,
    },
    /// A command from an owning observer.
    Observer(ObserverCommand),
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every player died.
    MatchOver,
    /// `max_ticks` was reached.
    TickLimit,
    /// The shutdown future resolved.
    Shutdown,
}

/// Cloneable access to a running match.
#[derive(Debug, Clone)]
pub struct MatchHandle {
    commands: mpsc::Sender<ServerCommand>,
    events: broadcast::Sender<TickedEvent>,
    snapshots: watch::Receiver<Arc<WorldSnapshot>>,
}

impl MatchHandle {
    /// Queue a command for the next tick.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Stopped`] once the loop has exited.
    pub async fn send(&self, command: ObserverCommand) -> Result<(), ServerError> {
        self.commands
            .send(ServerCommand::Observer(command))
            .await
            .map_err(|_| ServerError::Stopped)
    }

    /// Add a player and wait for their id.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Stopped`] once the loop has exited.
    pub async fn join(&self, name: impl Into<String>) -> Result<EntityId, ServerError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(ServerCommand::Join {
                name: name.into(),
                reply,
            })
            .await
            .map_err(|_| ServerError::Stopped)?;
        rx.await.map_err(|_| ServerError::Stopped)
    }

    /// Subscribe to replication events from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TickedEvent> {
        self.events.subscribe()
    }

    /// Latest published world snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<WorldSnapshot> {
        Arc::clone(&self.snapshots.borrow())
    }

    /// Latest snapshot, bincode encoded for a late joiner.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Game`] if encoding fails.
    pub fn snapshot_bytes(&self) -> Result<Vec<u8>, ServerError> {
        Ok(self.snapshot().encode()?)
    }
}

/// A match ready to run.
#[derive(Debug)]
pub struct MatchServer {
    sim: Simulation,
    config: ServerConfig,
    commands: mpsc::Receiver<ServerCommand>,
    snapshots: watch::Sender<Arc<WorldSnapshot>>,
}

impl MatchServer {
    /// Build a match from configuration, loading data files.
    ///
    /// Missing or malformed data files degrade to defaults with a warning.
    #[must_use]
    pub fn from_config(config: ServerConfig) -> (Self, MatchHandle) {
        let catalog = load_wave_catalog(config.waves_path.as_deref());
        let archetypes = load_archetypes(config.archetypes_path.as_deref());
        report_unknown_archetypes(&catalog, &archetypes);
        let sim = Simulation::new(config.simulation.clone(), catalog, &archetypes);
        Self::new(sim, config)
    }

    /// Wrap an existing simulation. The configured roster joins now.
    #[must_use]
    pub fn new(mut sim: Simulation, config: ServerConfig) -> (Self, MatchHandle) {
        let (observer, events) = BroadcastObserver::channel(config.broadcast_capacity);
        sim.add_observer(Box::new(observer));
        for name in &config.players {
            sim.add_player(name.clone());
        }

        let (command_tx, command_rx) = mpsc::channel(config.command_capacity);
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(sim.snapshot()));

        let handle = MatchHandle {
            commands: command_tx,
            events,
            snapshots: snapshot_rx,
        };
        let server = Self {
            sim,
            config,
            commands: command_rx,
            snapshots: snapshot_tx,
        };
        (server, handle)
    }

    /// The simulation, for inspection before the loop starts.
    #[must_use]
    pub const fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Run until the match ends, the tick limit is hit, or `shutdown`
    /// resolves. Returns the final summary.
    pub async fn run<F>(mut self, shutdown: F) -> (StopReason, MatchSummary)
    where
        F: Future<Output = ()>,
    {
        let period = Duration::from_secs(1) / self.config.tick_rate.max(1);
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        tracing::info!(
            tick_rate = self.config.tick_rate,
            players = self.sim.players().len(),
            "Match loop starting"
        );

        // Skip the first tick since it fires immediately
        ticker.tick().await;

        let reason = loop {
            tokio::select! {
                _ = ticker.tick() => {}
                () = &mut shutdown => break StopReason::Shutdown,
            }

            self.drain_commands();
            self.sim.tick();
            let tick = self.sim.current_tick();

            if self.config.snapshot_interval > 0 && tick % self.config.snapshot_interval == 0 {
                self.publish_snapshot();
            }
            if self.sim.is_match_over() {
                break StopReason::MatchOver;
            }
            if self.config.max_ticks.is_some_and(|max| tick >= max) {
                break StopReason::TickLimit;
            }
        };

        self.publish_snapshot();
        let summary = self.sim.summary_now();
        tracing::info!(
            reason = ?reason,
            ticks = summary.ticks,
            wave_reached = summary.wave_reached,
            "Match loop stopped"
        );
        (reason, summary)
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                ServerCommand::Join { name, reply } => {
                    let id = self.sim.add_player(name);
                    let _ = reply.send(id);
                }
                ServerCommand::Observer(command) => {
                    if let Err(e) = self.sim.apply_command(command) {
                        tracing::debug!(error = %e, ?command, "Command ignored");
                    }
                }
            }
        }
    }

    fn publish_snapshot(&self) {
        self.snapshots.send_replace(Arc::new(self.sim.snapshot()));
    }
}
