//! Core simulation loop: the match authority.
//!
//! [`Simulation`] owns every player, enemy and projectile, the wave
//! scheduler and the timer wheel, and is the only code that mutates
//! them. Each [`Simulation::tick`] runs, in order:
//!
//! 1. due timers (cooldowns, hop cycle, projectile expiry, explosion cleanup)
//! 2. the wave scheduler, which may spawn enemies
//! 3. enemy AI (enemies spawned this tick wait until the next one)
//! 4. player auto-attack
//! 5. projectiles
//! 6. physics: movement, gravity, fall checks
//!
//! and then publishes the tick's [`ReplicationEvent`]s to observers.
//!
//! # Determinism
//!
//! - Fixed-point math only (via [`Fixed`])
//! - One seeded [`ChaCha8Rng`] for every random choice
//! - `BTreeMap` storage, so iteration is in id order
//!
//! # Example
//!
//! ```
//! use horde_core::archetype::ArchetypeRegistry;
//! use horde_core::config::SimulationConfig;
//! use horde_core::simulation::Simulation;
//! use horde_core::waves::WaveCatalog;
//!
//! let mut sim = Simulation::new(
//!     SimulationConfig::with_seed(7),
//!     WaveCatalog::empty(),
//!     &ArchetypeRegistry::builtin(),
//! );
//! sim.add_player("ada");
//!
//! // Two seconds of warm-up, then the first wave starts.
//! for _ in 0..60 {
//!     sim.tick();
//! }
//! assert_eq!(sim.scheduler().current_wave(), Some(0));
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::ai::{self, EnemyAction, EnemyBrain, EnemyState, AIM_TURN_RATE, TURN_RATE};
use crate::archetype::{ArchetypeKind, ArchetypeRegistry, ArchetypeTemplate};
use crate::combat::{self, CombatEvent};
use crate::components::{EntityId, Health, Motion, Projectile, Side, Transform};
use crate::config::SimulationConfig;
use crate::error::{GameError, Result};
use crate::math::{seconds_to_ticks, Fixed, Vec3Fixed};
use crate::player::{smoothed_velocity, Player, PlayerRegistry};
use crate::replication::{
    MatchSummary, ObserverCommand, PlayerKills, ReplicationEvent, ReplicationHub, StateObserver,
};
use crate::scheduler::{SchedulerAction, SchedulerPhase, SpawnOrder, SpawnSlot, WaveScheduler};
use crate::timers::{TimerEntry, TimerKind, TimerWheel};
use crate::waves::{scaled_max_health, WaveCatalog};

/// Ticks per second for the simulation.
pub const TICK_RATE: u32 = 20;

/// Duration of one tick in milliseconds.
pub const TICK_DURATION_MS: u32 = 1000 / TICK_RATE;

/// Height of a body's center above its feet; projectiles aim here.
pub const BODY_CENTER_HEIGHT: Fixed = Fixed::from_bits(1 << 32);

/// Height above its feet at which a sniper's projectile appears.
pub const MUZZLE_HEIGHT: Fixed = Fixed::from_bits(3 << 31);

/// A live enemy.
#[derive(Debug, Clone)]
pub struct Enemy {
    /// Entity id.
    pub id: EntityId,
    /// Archetype this enemy was spawned from.
    pub template: Arc<ArchetypeTemplate>,
    /// Wave that spawned it (`None` for direct spawns).
    pub wave_index: Option<u32>,
    /// Scaled health.
    pub health: Health,
    /// Placement.
    pub transform: Transform,
    /// Kinematics.
    pub motion: Motion,
    /// Behavior memory.
    pub brain: EnemyBrain,
}

impl Enemy {
    /// Archetype name.
    #[must_use]
    pub fn archetype(&self) -> &str {
        &self.template.name
    }

    /// Current position.
    #[must_use]
    pub const fn position(&self) -> Vec3Fixed {
        self.transform.position
    }

    /// Current behavior state.
    #[must_use]
    pub const fn state(&self) -> EnemyState {
        self.brain.state
    }

    /// Whether players can still target and damage this enemy.
    ///
    /// A bomber that has exploded lingers until cleanup but is spent.
    #[must_use]
    pub const fn is_targetable(&self) -> bool {
        !self.brain.has_exploded && self.health.current > 0
    }

    fn snapshot(&self) -> EnemySnapshot {
        EnemySnapshot {
            id: self.id,
            archetype: self.template.name.clone(),
            wave_index: self.wave_index,
            health: self.health,
            transform: self.transform,
            motion: self.motion,
            brain: self.brain,
        }
    }
}

/// Everything that happened during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickEvents {
    /// Tick that produced these events.
    pub tick: u64,
    /// State changes, in mutation order.
    pub replication: Vec<ReplicationEvent>,
    /// Every hurt resolved this tick.
    pub combat: Vec<CombatEvent>,
    /// Scheduler output.
    pub scheduler: Vec<SchedulerAction>,
    /// Enemies spawned this tick.
    pub spawned: Vec<EntityId>,
}

/// Replicated view of an enemy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnemySnapshot {
    /// Entity id.
    pub id: EntityId,
    /// Archetype name.
    pub archetype: String,
    /// Spawning wave.
    pub wave_index: Option<u32>,
    /// Health.
    pub health: Health,
    /// Placement.
    pub transform: Transform,
    /// Kinematics.
    pub motion: Motion,
    /// Behavior memory.
    pub brain: EnemyBrain,
}

/// Full world state, sent to observers that join late.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Tick the snapshot was taken.
    pub tick: u64,
    /// Scheduler phase.
    pub phase: SchedulerPhase,
    /// Most recently started wave.
    pub current_wave: Option<u32>,
    /// Roster, spectators included.
    pub players: Vec<Player>,
    /// Live enemies.
    pub enemies: Vec<EnemySnapshot>,
    /// Projectiles in flight.
    pub projectiles: Vec<(EntityId, Projectile)>,
}

impl WorldSnapshot {
    /// Encode with bincode.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Serialization`] if encoding fails.
    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| GameError::Serialization(e.to_string()))
    }

    /// Decode from bincode.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Serialization`] if the bytes are not a snapshot.
    pub fn decode(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data).map_err(|e| GameError::Serialization(e.to_string()))
    }
}

/// The match authority.
#[derive(Debug)]
pub struct Simulation {
    tick: u64,
    dt: Fixed,
    config: SimulationConfig,
    rng: ChaCha8Rng,
    next_id: EntityId,
    players: PlayerRegistry,
    departed: Vec<PlayerKills>,
    enemies: BTreeMap<EntityId, Enemy>,
    projectiles: BTreeMap<EntityId, Projectile>,
    templates: BTreeMap<String, Arc<ArchetypeTemplate>>,
    timers: TimerWheel,
    scheduler: WaveScheduler,
    catalog: WaveCatalog,
    hub: ReplicationHub,
    outbox: Vec<ReplicationEvent>,
    combat_log: Vec<CombatEvent>,
    summary: Option<MatchSummary>,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(
            SimulationConfig::default(),
            WaveCatalog::empty(),
            &ArchetypeRegistry::builtin(),
        )
    }
}

impl Simulation {
    /// Create a new match.
    #[must_use]
    pub fn new(config: SimulationConfig, catalog: WaveCatalog, archetypes: &ArchetypeRegistry) -> Self {
        let ready_at = seconds_to_ticks(config.warmup_seconds, TICK_RATE);
        let rest_ticks = if config.wave_rest_seconds > Fixed::ZERO {
            seconds_to_ticks(config.wave_rest_seconds, TICK_RATE)
        } else {
            0
        };
        let templates = archetypes
            .templates()
            .map(|t| (t.key(), Arc::new(t.clone())))
            .collect();

        tracing::info!(
            seed = config.seed,
            waves = catalog.len(),
            archetypes = archetypes.len(),
            ready_at,
            "Simulation created"
        );

        Self {
            tick: 0,
            dt: Fixed::from_num(1) / Fixed::from_num(TICK_RATE),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            next_id: 1,
            players: PlayerRegistry::new(),
            departed: Vec::new(),
            enemies: BTreeMap::new(),
            projectiles: BTreeMap::new(),
            templates,
            timers: TimerWheel::new(),
            scheduler: WaveScheduler::new(ready_at, rest_ticks, TICK_RATE),
            catalog,
            hub: ReplicationHub::new(),
            outbox: Vec::new(),
            combat_log: Vec::new(),
            summary: None,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Get the current tick number.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The roster.
    #[must_use]
    pub const fn players(&self) -> &PlayerRegistry {
        &self.players
    }

    /// A player by id.
    #[must_use]
    pub fn player(&self, id: EntityId) -> Option<&Player> {
        self.players.get(id)
    }

    /// Live enemies in id order.
    pub fn enemies(&self) -> impl Iterator<Item = &Enemy> {
        self.enemies.values()
    }

    /// An enemy by id.
    #[must_use]
    pub fn enemy(&self, id: EntityId) -> Option<&Enemy> {
        self.enemies.get(&id)
    }

    /// Number of live enemies.
    #[must_use]
    pub fn enemy_count(&self) -> usize {
        self.enemies.len()
    }

    /// Projectiles in flight, in id order.
    pub fn projectiles(&self) -> impl Iterator<Item = (EntityId, &Projectile)> {
        self.projectiles.iter().map(|(id, p)| (*id, p))
    }

    /// The wave scheduler.
    #[must_use]
    pub const fn scheduler(&self) -> &WaveScheduler {
        &self.scheduler
    }

    /// The wave catalog.
    #[must_use]
    pub const fn catalog(&self) -> &WaveCatalog {
        &self.catalog
    }

    /// Pending timers.
    #[must_use]
    pub const fn timers(&self) -> &TimerWheel {
        &self.timers
    }

    /// Whether the match has ended.
    #[must_use]
    pub fn is_match_over(&self) -> bool {
        self.scheduler.is_finished()
    }

    /// Summary recorded when the match ended.
    #[must_use]
    pub const fn match_summary(&self) -> Option<&MatchSummary> {
        self.summary.as_ref()
    }

    /// Final summary if the match ended, otherwise the tallies so far.
    #[must_use]
    pub fn summary_now(&self) -> MatchSummary {
        self.summary
            .clone()
            .unwrap_or_else(|| self.build_summary(self.scheduler.waves_started()))
    }

    /// Register a replication observer.
    pub fn add_observer(&mut self, observer: Box<dyn StateObserver>) {
        self.hub.subscribe(observer);
    }

    // ------------------------------------------------------------------
    // Roster and commands
    // ------------------------------------------------------------------

    /// Add a player to the roster and place them on the arena.
    pub fn add_player(&mut self, name: impl Into<String>) -> EntityId {
        let id = self.allocate_id();
        let slot = i32::try_from(self.players.len()).unwrap_or(0);
        let mut position = Vec3Fixed::new(Fixed::from_num(slot * 2), Fixed::ZERO, Fixed::ZERO);
        let probe = Vec3Fixed::new(position.x, Fixed::from_num(1000), position.z);
        position.y = self.config.arena.ground_below(probe).unwrap_or(Fixed::ZERO);

        let stats = self.config.player;
        let mut player = Player::new(id, name, stats.max_health, position);
        player.motion.grounded = true;
        player.next_scan_at = self.tick + seconds_to_ticks(stats.attack_rate, TICK_RATE);

        tracing::info!(player = id, name = %player.name, "Player joined");
        self.players.insert(player);
        id
    }

    /// Remove a player from the roster. Their kills still count.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] for unknown players.
    pub fn remove_player(&mut self, id: EntityId) -> Result<()> {
        let player = self.players.remove(id).ok_or(GameError::EntityNotFound(id))?;
        tracing::info!(player = id, kills = player.kills, "Player left");
        self.departed.push(PlayerKills {
            player: player.id,
            name: player.name,
            kills: player.kills,
        });
        Ok(())
    }

    /// Apply a command from an observer.
    ///
    /// Commands from spectating players are accepted and ignored.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] if the player is unknown.
    pub fn apply_command(&mut self, command: ObserverCommand) -> Result<()> {
        let id = command.player();
        let player = self.players.get_mut(id).ok_or(GameError::EntityNotFound(id))?;

        match command {
            ObserverCommand::Move { direction, .. } => {
                if !direction.is_within_world() {
                    return Err(GameError::InvalidCommand(format!(
                        "player {id}: movement direction out of range"
                    )));
                }
                if player.is_alive() {
                    player.set_intent(direction);
                }
            }
            ObserverCommand::Jump { .. } => {
                if player.is_alive() {
                    player.jump_requested = true;
                }
            }
            ObserverCommand::Attack {
                target_position, ..
            } => {
                self.submit_attack(id, target_position)?;
            }
            ObserverCommand::Leave { .. } => self.remove_player(id)?,
        }
        Ok(())
    }

    /// Validate and execute a player's attack intent.
    ///
    /// Returns `Ok(false)` when the attack is rejected: player dead,
    /// weapon cooling down, or target beyond range plus tolerance.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] if the player is unknown and
    /// [`GameError::InvalidCommand`] if the target lies outside the world.
    pub fn submit_attack(&mut self, id: EntityId, target_position: Vec3Fixed) -> Result<bool> {
        let stats = self.config.player;
        let player = self.players.get_mut(id).ok_or(GameError::EntityNotFound(id))?;
        if !target_position.is_within_world() {
            return Err(GameError::InvalidCommand(format!(
                "player {id}: attack target out of range"
            )));
        }

        if !player.is_alive() || self.tick < player.weapon_ready_at {
            return Ok(false);
        }
        let reach = stats.range_radius + self.config.attack_range_tolerance;
        if player.position().distance(target_position) > reach {
            tracing::debug!(player = id, "Attack rejected: target out of range");
            return Ok(false);
        }

        player.weapon_ready_at = self.tick + seconds_to_ticks(stats.attack_rate, TICK_RATE);
        let center = Vec3Fixed::UP.scale(BODY_CENTER_HEIGHT);
        let projectile = Projectile::aimed(
            id,
            Side::Players,
            player.position() + center,
            target_position + center,
            stats.projectile_speed,
            stats.attack_damage,
        );
        self.spawn_projectile(projectile);
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Combat
    // ------------------------------------------------------------------

    /// Spawn an enemy of `archetype` at `position`.
    ///
    /// Max health is scaled by `health_multiplier` and the current number
    /// of living players (at least one).
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownArchetype`] if the name is not registered.
    pub fn spawn_enemy(
        &mut self,
        archetype: &str,
        position: Vec3Fixed,
        health_multiplier: Fixed,
    ) -> Result<EntityId> {
        self.spawn_enemy_for_wave(archetype, position, health_multiplier, None)
    }

    fn spawn_enemy_for_wave(
        &mut self,
        archetype: &str,
        position: Vec3Fixed,
        health_multiplier: Fixed,
        wave_index: Option<u32>,
    ) -> Result<EntityId> {
        let template = self
            .templates
            .get(&archetype.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| GameError::UnknownArchetype(archetype.to_string()))?;

        let living = self.players.living_count().max(1);
        let max_health = scaled_max_health(template.max_health, health_multiplier, living);
        let mut health = Health::new(template.max_health);
        health.reset_max(max_health);
        let mut transform = Transform::at(position);
        if let Some(target) = ai::nearest_player(&self.players, position, None) {
            let toward = (target.position - position).horizontal().normalize();
            if !toward.is_zero() {
                transform.facing = toward;
            }
        }

        let id = self.allocate_id();
        self.enemies.insert(
            id,
            Enemy {
                id,
                template: Arc::clone(&template),
                wave_index,
                health,
                transform,
                motion: Motion::default(),
                brain: EnemyBrain::default(),
            },
        );
        self.outbox.push(ReplicationEvent::EnemySpawned {
            entity: id,
            archetype: template.name.clone(),
            position,
            max_health,
        });
        tracing::debug!(
            tick = self.tick,
            enemy = id,
            archetype = %template.name,
            max_health,
            "Enemy spawned"
        );
        Ok(id)
    }

    /// Damage an enemy.
    ///
    /// On death the attacker (if a player) is credited with the kill
    /// and the enemy is removed, all exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] if the enemy does not exist
    /// (including one already removed). A spent bomber takes no damage.
    pub fn hurt_enemy(
        &mut self,
        id: EntityId,
        damage: u32,
        attacker: Option<EntityId>,
    ) -> Result<CombatEvent> {
        let enemy = self.enemies.get_mut(&id).ok_or(GameError::EntityNotFound(id))?;
        if !enemy.is_targetable() {
            return Ok(CombatEvent {
                target: id,
                damage: 0,
                resulting_health: enemy.health.current,
                died: false,
            });
        }
        let old = enemy.health.current;
        let event = combat::hurt(&mut enemy.health, id, damage);
        self.combat_log.push(event);

        if event.changed_health() {
            self.outbox.push(ReplicationEvent::HealthChanged {
                entity: id,
                old,
                new: event.resulting_health,
            });
            self.outbox.push(ReplicationEvent::DamageFlash { entity: id });
        }

        if event.died {
            if let Some(player) = attacker {
                self.players.record_kill(player);
            }
            self.outbox.push(ReplicationEvent::Died {
                entity: id,
                killer: attacker,
            });
            self.remove_enemy(id);
            tracing::debug!(tick = self.tick, enemy = id, killer = ?attacker, "Enemy killed");
        }
        Ok(event)
    }

    /// Damage a player.
    ///
    /// On death the player becomes a spectator: movement and attacks stop.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] if the player is unknown.
    pub fn hurt_player(
        &mut self,
        id: EntityId,
        damage: u32,
        source: Option<EntityId>,
    ) -> Result<CombatEvent> {
        let player = self.players.get_mut(id).ok_or(GameError::EntityNotFound(id))?;
        let old = player.health.current;
        let event = combat::hurt(&mut player.health, id, damage);
        self.combat_log.push(event);

        if event.changed_health() {
            self.outbox.push(ReplicationEvent::HealthChanged {
                entity: id,
                old,
                new: event.resulting_health,
            });
            self.outbox.push(ReplicationEvent::DamageFlash { entity: id });
        }

        if event.died {
            player.mark_dead();
            self.outbox.push(ReplicationEvent::Died {
                entity: id,
                killer: source,
            });
            tracing::info!(tick = self.tick, player = id, killer = ?source, "Player died");
        }
        Ok(event)
    }

    /// Heal a living player, clamped at max health.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] if the player is unknown.
    pub fn heal_player(&mut self, id: EntityId, amount: u32) -> Result<u32> {
        let player = self.players.get_mut(id).ok_or(GameError::EntityNotFound(id))?;
        let old = player.health.current;
        let healed = combat::heal(&mut player.health, amount);
        if healed > 0 {
            self.outbox.push(ReplicationEvent::HealthChanged {
                entity: id,
                old,
                new: player.health.current,
            });
        }
        Ok(healed)
    }

    /// Detonate a bomber.
    ///
    /// The exploded flag is set before any damage is dealt, so a second
    /// trigger (from AI or anywhere else) returns `Ok(false)` and deals
    /// nothing. The bomber is removed shortly afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] for unknown enemies and
    /// [`GameError::InvalidCommand`] for enemies that are not bombers.
    pub fn trigger_explosion(&mut self, id: EntityId) -> Result<bool> {
        let enemy = self.enemies.get_mut(&id).ok_or(GameError::EntityNotFound(id))?;
        let (radius, damage) = match &enemy.template.kind {
            ArchetypeKind::Bomber {
                explosion_radius,
                explosion_damage,
            } => (*explosion_radius, *explosion_damage),
            other => {
                return Err(GameError::InvalidCommand(format!(
                    "enemy {id} is a {} and cannot explode",
                    other.label()
                )))
            }
        };
        if enemy.brain.has_exploded {
            return Ok(false);
        }
        enemy.brain.has_exploded = true;
        enemy.brain.state = EnemyState::Explode;
        enemy.motion.velocity = Vec3Fixed::ZERO;
        let center = enemy.transform.position;

        self.outbox.push(ReplicationEvent::Explosion {
            entity: id,
            position: center,
            radius,
        });
        for player in self.players.living_ids() {
            let in_blast = self
                .players
                .get(player)
                .is_some_and(|p| combat::within_radius(center, p.position(), radius));
            if in_blast {
                self.hurt_player(player, damage, Some(id))?;
            }
        }

        let cleanup = seconds_to_ticks(self.config.explosion_cleanup_seconds, TICK_RATE);
        self.timers
            .schedule(self.tick + cleanup, id, TimerKind::ExplosionCleanup);
        tracing::debug!(tick = self.tick, enemy = id, "Bomber exploded");
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Advance the simulation by one tick.
    pub fn tick(&mut self) -> TickEvents {
        self.tick += 1;
        let now = self.tick;

        for entry in self.timers.drain_due(now) {
            self.fire_timer(entry);
        }

        let (actions, spawned) = self.run_scheduler();

        let acting: Vec<EntityId> = self
            .enemies
            .keys()
            .copied()
            .filter(|id| !spawned.contains(id))
            .collect();
        for id in acting {
            self.run_enemy(id);
        }

        self.run_auto_attack();
        self.run_projectiles();
        self.run_player_physics();
        self.run_enemy_physics();

        let replication = std::mem::take(&mut self.outbox);
        self.hub.publish(now, &replication);
        tracing::trace!(
            tick = now,
            enemies = self.enemies.len(),
            events = replication.len(),
            "Tick complete"
        );

        TickEvents {
            tick: now,
            replication,
            combat: std::mem::take(&mut self.combat_log),
            scheduler: actions,
            spawned,
        }
    }

    fn fire_timer(&mut self, entry: TimerEntry) {
        tracing::trace!(tick = self.tick, owner = entry.owner, kind = ?entry.kind, "Timer fired");
        match entry.kind {
            TimerKind::WeaponReady => {
                if let Some(enemy) = self.enemies.get_mut(&entry.owner) {
                    enemy.brain.weapon_ready = true;
                }
            }
            TimerKind::HopReady => {
                if let Some(enemy) = self.enemies.get_mut(&entry.owner) {
                    enemy.brain.hop_ready = true;
                }
            }
            TimerKind::ProjectileExpire => {
                self.remove_projectile(entry.owner);
            }
            TimerKind::ExplosionCleanup => {
                self.remove_enemy(entry.owner);
            }
        }
    }

    fn run_scheduler(&mut self) -> (Vec<SchedulerAction>, Vec<EntityId>) {
        let living = self.players.living_count();
        let roster = self.players.len();
        let actions = self
            .scheduler
            .update(self.tick, living, roster, &self.catalog);

        let mut spawned = Vec::new();
        for action in &actions {
            match action {
                SchedulerAction::WaveStarted { index, name, total } => {
                    self.outbox.push(ReplicationEvent::WaveStarted {
                        index: *index,
                        name: name.clone(),
                        total: *total,
                    });
                }
                SchedulerAction::Spawn(order) => {
                    if let Some(id) = self.execute_spawn(order) {
                        spawned.push(id);
                    }
                }
                SchedulerAction::WaveCompleted { index } => {
                    self.outbox
                        .push(ReplicationEvent::WaveCompleted { index: *index });
                }
                SchedulerAction::WaveAborted { index, spawned } => {
                    self.outbox.push(ReplicationEvent::WaveAborted {
                        index: *index,
                        spawned: *spawned,
                    });
                }
                SchedulerAction::MatchEnded { waves_started } => {
                    let summary = self.build_summary(*waves_started);
                    self.summary = Some(summary.clone());
                    self.outbox.push(ReplicationEvent::MatchEnded { summary });
                }
            }
        }
        (actions, spawned)
    }

    fn execute_spawn(&mut self, order: &SpawnOrder) -> Option<EntityId> {
        let living = self.players.living_ids();
        if living.is_empty() {
            return None;
        }
        let anchor_id = living[self.rng.gen_range(0..living.len())];
        let anchor = self.players.get(anchor_id)?.position();

        let archetype = match &order.slot {
            SpawnSlot::Archetype(name) => name.clone(),
            SpawnSlot::AnyOf(names) if !names.is_empty() => {
                names[self.rng.gen_range(0..names.len())].clone()
            }
            SpawnSlot::AnyOf(_) => {
                if self.templates.is_empty() {
                    tracing::warn!("No archetypes registered, skipping spawn");
                    return None;
                }
                let pick = self.rng.gen_range(0..self.templates.len());
                self.templates.keys().nth(pick)?.clone()
            }
        };
        if !self.templates.contains_key(&archetype.to_ascii_lowercase()) {
            tracing::warn!(archetype = %archetype, wave = order.wave_index, "Unknown archetype, skipping spawn");
            return None;
        }

        let Some(point) =
            self.config
                .spawn
                .find_spawn_point(anchor, &self.config.arena, &mut self.rng)
        else {
            tracing::debug!(player = anchor_id, wave = order.wave_index, "Spawn skipped, no ground");
            return None;
        };

        self.spawn_enemy_for_wave(&archetype, point, order.health_multiplier, Some(order.wave_index))
            .ok()
    }

    fn run_enemy(&mut self, id: EntityId) {
        let now = self.tick;
        let dt = self.dt;
        let Some(enemy) = self.enemies.get(&id) else {
            return;
        };
        let template = Arc::clone(&enemy.template);
        let position = enemy.transform.position;
        let sighting = ai::nearest_player(&self.players, position, template.detection_radius);
        let (state, action) = ai::decide(&template, &enemy.brain, sighting.as_ref());

        let mut desired = Vec3Fixed::ZERO;
        match action {
            EnemyAction::MoveToward(point) => {
                desired = (point - position).horizontal().normalize().scale(template.speed);
            }
            EnemyAction::MoveAway(point) => {
                desired = (position - point).horizontal().normalize().scale(template.speed);
            }
            EnemyAction::Strike(target) => {
                self.start_weapon_cooldown(id, template.attack_rate);
                if let Err(e) = self.hurt_player(target, template.attack_damage, Some(id)) {
                    tracing::debug!(enemy = id, error = %e, "Strike missed");
                }
            }
            EnemyAction::Shoot { aim, .. } => {
                if let ArchetypeKind::Sniper {
                    shoot_cooldown,
                    projectile_speed,
                    projectile_damage,
                    ..
                } = template.kind
                {
                    self.start_weapon_cooldown(id, shoot_cooldown);
                    let projectile = Projectile::aimed(
                        id,
                        Side::Enemies,
                        position + Vec3Fixed::UP.scale(MUZZLE_HEIGHT),
                        aim + Vec3Fixed::UP.scale(BODY_CENTER_HEIGHT),
                        projectile_speed,
                        projectile_damage,
                    );
                    self.spawn_projectile(projectile);
                }
            }
            EnemyAction::Explode => {
                if let Err(e) = self.trigger_explosion(id) {
                    tracing::debug!(enemy = id, error = %e, "Explosion skipped");
                }
            }
            EnemyAction::Idle | EnemyAction::Hold => {}
        }

        let Some(enemy) = self.enemies.get_mut(&id) else {
            return;
        };
        enemy.brain.state = state;
        enemy.brain.target = sighting.map(|s| s.player);
        if enemy.brain.has_exploded {
            return;
        }

        if let Some(target) = &sighting {
            let rate = match template.kind {
                ArchetypeKind::Sniper { .. } => AIM_TURN_RATE,
                _ => TURN_RATE,
            };
            enemy.transform.facing =
                ai::turn_toward(enemy.transform.facing, target.position - position, rate, dt);
        }
        enemy.motion.velocity = ai::steer(enemy.motion.velocity, desired, template.acceleration, dt);

        if sighting.is_some() && enemy.brain.hop_ready && enemy.motion.grounded {
            enemy.brain.hop_ready = false;
            self.outbox.push(ReplicationEvent::Hop {
                entity: id,
                height: template.hop_height,
                duration: template.hop_duration,
            });
            let wait = seconds_to_ticks(template.hop_cooldown + template.hop_duration, TICK_RATE);
            self.timers.schedule(now + wait, id, TimerKind::HopReady);
        }
    }

    fn start_weapon_cooldown(&mut self, id: EntityId, seconds: Fixed) {
        if let Some(enemy) = self.enemies.get_mut(&id) {
            enemy.brain.weapon_ready = false;
            let due = self.tick + seconds_to_ticks(seconds, TICK_RATE);
            self.timers.schedule(due, id, TimerKind::WeaponReady);
        }
    }

    fn run_auto_attack(&mut self) {
        let stats = self.config.player;
        if !stats.auto_attack {
            return;
        }
        for id in self.players.living_ids() {
            let Some(player) = self.players.get_mut(id) else {
                continue;
            };
            if self.tick < player.next_scan_at {
                continue;
            }
            player.next_scan_at = self.tick + seconds_to_ticks(stats.attack_rate, TICK_RATE);
            let origin = player.position();

            if let Some(target) = self.nearest_enemy(origin, stats.range_radius) {
                if let Err(e) = self.submit_attack(id, target) {
                    tracing::debug!(player = id, error = %e, "Auto-attack skipped");
                }
            }
        }
    }

    /// Position of the nearest enemy within `range` of `from`; ties keep
    /// the lowest id.
    fn nearest_enemy(&self, from: Vec3Fixed, range: Fixed) -> Option<Vec3Fixed> {
        let mut best: Option<(Fixed, Vec3Fixed)> = None;
        for enemy in self.enemies.values().filter(|e| e.is_targetable()) {
            let distance = from.distance(enemy.position());
            if distance > range {
                continue;
            }
            if best.map_or(true, |(d, _)| distance < d) {
                best = Some((distance, enemy.position()));
            }
        }
        best.map(|(_, position)| position)
    }

    fn run_projectiles(&mut self) {
        let dt = self.dt;
        let center = Vec3Fixed::UP.scale(BODY_CENTER_HEIGHT);
        let ids: Vec<EntityId> = self.projectiles.keys().copied().collect();

        for pid in ids {
            let Some(projectile) = self.projectiles.get_mut(&pid) else {
                continue;
            };
            projectile.position += projectile.velocity.scale(dt);
            let projectile = *projectile;

            if projectile.position.y < self.config.fall_threshold {
                self.remove_projectile(pid);
                continue;
            }

            let radius = self.config.hit_radius;
            match projectile.side {
                Side::Players => {
                    let hit = self
                        .enemies
                        .values()
                        .filter(|e| e.is_targetable())
                        .find(|e| combat::within_radius(e.position() + center, projectile.position, radius))
                        .map(|e| e.id);
                    if let Some(enemy) = hit {
                        self.remove_projectile(pid);
                        if let Err(e) = self.hurt_enemy(enemy, projectile.damage, Some(projectile.source)) {
                            tracing::debug!(projectile = pid, error = %e, "Hit not applied");
                        }
                    }
                }
                Side::Enemies => {
                    let hit = self
                        .players
                        .living()
                        .find(|p| combat::within_radius(p.position() + center, projectile.position, radius))
                        .map(|p| p.id);
                    if let Some(player) = hit {
                        self.remove_projectile(pid);
                        if let Err(e) = self.hurt_player(player, projectile.damage, Some(projectile.source)) {
                            tracing::debug!(projectile = pid, error = %e, "Hit not applied");
                        }
                    }
                }
            }
        }
    }

    fn run_player_physics(&mut self) {
        let dt = self.dt;
        let stats = self.config.player;
        let mut fallen = Vec::new();

        for id in self.players.living_ids() {
            let Some(player) = self.players.get_mut(id) else {
                continue;
            };
            let before = player.transform;

            player.motion.velocity = smoothed_velocity(player.motion.velocity, player.intent, &stats, dt);
            if std::mem::take(&mut player.jump_requested) && player.motion.grounded {
                player.motion.vertical_velocity = stats.jump_force;
                player.motion.grounded = false;
            }

            player.transform.position += player.motion.velocity.scale(dt);
            if !player.motion.velocity.is_zero() {
                player.transform.facing = player.motion.velocity.normalize();
            }
            player.motion.grounded = self.config.arena.settle(
                &mut player.transform.position,
                &mut player.motion.vertical_velocity,
                self.config.gravity,
                dt,
            );

            if player.transform != before {
                self.outbox.push(ReplicationEvent::Transform {
                    entity: id,
                    position: player.transform.position,
                    facing: player.transform.facing,
                });
            }
            if player.transform.position.y < self.config.fall_threshold {
                fallen.push((id, player.health.current));
            }
        }

        for (id, remaining) in fallen {
            tracing::info!(tick = self.tick, player = id, "Player fell off the arena");
            if let Err(e) = self.hurt_player(id, remaining, None) {
                tracing::debug!(player = id, error = %e, "Fall damage not applied");
            }
        }
    }

    fn run_enemy_physics(&mut self) {
        let dt = self.dt;
        let mut fallen = Vec::new();

        for enemy in self.enemies.values_mut() {
            let before = enemy.transform;
            enemy.transform.position += enemy.motion.velocity.scale(dt);
            enemy.motion.grounded = self.config.arena.settle(
                &mut enemy.transform.position,
                &mut enemy.motion.vertical_velocity,
                self.config.gravity,
                dt,
            );
            if enemy.transform != before {
                self.outbox.push(ReplicationEvent::Transform {
                    entity: enemy.id,
                    position: enemy.transform.position,
                    facing: enemy.transform.facing,
                });
            }
            if enemy.transform.position.y < self.config.fall_threshold {
                fallen.push(enemy.id);
            }
        }

        for id in fallen {
            self.outbox.push(ReplicationEvent::Died {
                entity: id,
                killer: None,
            });
            self.remove_enemy(id);
        }
    }

    // ------------------------------------------------------------------
    // Entity bookkeeping
    // ------------------------------------------------------------------

    fn allocate_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn spawn_projectile(&mut self, projectile: Projectile) -> EntityId {
        let id = self.allocate_id();
        let lifetime = seconds_to_ticks(self.config.projectile_lifetime, TICK_RATE);
        self.timers
            .schedule(self.tick + lifetime, id, TimerKind::ProjectileExpire);
        self.outbox.push(ReplicationEvent::ProjectileSpawned {
            entity: id,
            source: projectile.source,
            position: projectile.position,
            velocity: projectile.velocity,
        });
        self.projectiles.insert(id, projectile);
        id
    }

    fn remove_projectile(&mut self, id: EntityId) -> bool {
        if self.projectiles.remove(&id).is_none() {
            return false;
        }
        self.timers.cancel_owner(id);
        self.outbox.push(ReplicationEvent::ProjectileRemoved { entity: id });
        true
    }

    fn remove_enemy(&mut self, id: EntityId) -> bool {
        if self.enemies.remove(&id).is_none() {
            return false;
        }
        self.timers.cancel_owner(id);
        self.outbox.push(ReplicationEvent::EnemyRemoved { entity: id });
        true
    }

    fn build_summary(&self, waves_started: u32) -> MatchSummary {
        let mut kills: Vec<PlayerKills> = self
            .players
            .iter()
            .map(|p| PlayerKills {
                player: p.id,
                name: p.name.clone(),
                kills: p.kills,
            })
            .chain(self.departed.iter().cloned())
            .collect();
        kills.sort_by_key(|k| k.player);
        MatchSummary {
            wave_reached: waves_started,
            kills,
            ticks: self.tick,
        }
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    /// Capture the replicated world state.
    #[must_use]
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            tick: self.tick,
            phase: self.scheduler.phase(),
            current_wave: self.scheduler.current_wave(),
            players: self.players.iter().cloned().collect(),
            enemies: self.enemies.values().map(Enemy::snapshot).collect(),
            projectiles: self.projectiles.iter().map(|(id, p)| (*id, *p)).collect(),
        }
    }

    /// Compute a hash of the current simulation state.
    ///
    /// Covers the replicated world, pending timers, scheduler state and
    /// the RNG stream position, so two runs that diverge in any of them
    /// hash differently.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.snapshot().hash(&mut hasher);
        self.timers.hash(&mut hasher);
        self.scheduler.hash(&mut hasher);
        self.rng.get_word_pos().hash(&mut hasher);
        let hash = hasher.finish();
        tracing::trace!(tick = self.tick, state_hash = hash, "Computed state hash");
        hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waves::{EnemyGroup, WaveComposition, WaveDefinition};

    fn quiet_config() -> SimulationConfig {
        let mut config = SimulationConfig::with_seed(3);
        config.player.auto_attack = false;
        // No waves unless a test asks for them.
        config.warmup_seconds = Fixed::from_num(1000);
        config
    }

    fn sim() -> Simulation {
        Simulation::new(quiet_config(), WaveCatalog::empty(), &ArchetypeRegistry::builtin())
    }

    #[test]
    fn test_simulation_new() {
        let sim = Simulation::default();
        assert_eq!(sim.current_tick(), 0);
        assert_eq!(sim.enemy_count(), 0);
        assert!(!sim.is_match_over());
    }

    #[test]
    fn test_tick_increments() {
        let mut sim = sim();
        sim.add_player("a");
        let events = sim.tick();
        assert_eq!(events.tick, 1);
        assert_eq!(sim.current_tick(), 1);
    }

    #[test]
    fn test_spawn_enemy_scales_health_by_living_players() {
        let mut sim = sim();
        sim.add_player("a");
        sim.add_player("b");
        let id = sim
            .spawn_enemy("slime", Vec3Fixed::from_ints(5, 0, 0), Fixed::from_num(1))
            .unwrap();
        assert_eq!(sim.enemy(id).unwrap().health, Health::new(10));
        assert!(matches!(
            sim.spawn_enemy("dragon", Vec3Fixed::ZERO, Fixed::from_num(1)),
            Err(GameError::UnknownArchetype(_))
        ));
    }

    #[test]
    fn test_kill_credited_once_and_enemy_removed() {
        let mut sim = sim();
        let p = sim.add_player("a");
        let e = sim
            .spawn_enemy("slime", Vec3Fixed::from_ints(5, 0, 0), Fixed::from_num(1))
            .unwrap();

        let event = sim.hurt_enemy(e, 100, Some(p)).unwrap();
        assert!(event.died);
        assert!(sim.enemy(e).is_none());
        assert_eq!(sim.player(p).unwrap().kills, 1);
        assert!(matches!(
            sim.hurt_enemy(e, 1, Some(p)),
            Err(GameError::EntityNotFound(_))
        ));
        assert_eq!(sim.player(p).unwrap().kills, 1);
    }

    #[test]
    fn test_player_death_makes_spectator() {
        let mut sim = sim();
        let p = sim.add_player("a");
        let event = sim.hurt_player(p, 999, None).unwrap();
        assert!(event.died);
        let player = sim.player(p).unwrap();
        assert!(player.died);
        assert_eq!(player.tag, crate::player::PlayerTag::Spectator);

        let again = sim.hurt_player(p, 5, None).unwrap();
        assert!(!again.died);
        assert_eq!(sim.heal_player(p, 5).unwrap(), 0);
    }

    #[test]
    fn test_melee_enemy_strikes_on_cooldown() {
        let mut sim = sim();
        let p = sim.add_player("a");
        sim.spawn_enemy("slime", Vec3Fixed::from_ints(1, 0, 0), Fixed::from_num(1))
            .unwrap();

        // Slime: 1 damage every 2 s (40 ticks).
        for _ in 0..81 {
            sim.tick();
        }
        assert_eq!(sim.player(p).unwrap().health.current, 10 - 3);
    }

    #[test]
    fn test_dead_commands_are_ignored_and_unknown_rejected() {
        let mut sim = sim();
        let p = sim.add_player("a");
        sim.hurt_player(p, 999, None).unwrap();
        sim.apply_command(ObserverCommand::Move {
            player: p,
            direction: Vec3Fixed::from_ints(1, 0, 0),
        })
        .unwrap();
        assert!(sim.player(p).unwrap().intent.is_zero());
        assert!(matches!(
            sim.apply_command(ObserverCommand::Jump { player: 404 }),
            Err(GameError::EntityNotFound(404))
        ));
    }

    #[test]
    fn test_attack_intent_validation() {
        let mut sim = sim();
        let p = sim.add_player("a");
        let far = Vec3Fixed::from_ints(40, 0, 0);
        assert!(!sim.submit_attack(p, far).unwrap());

        let near = Vec3Fixed::from_ints(3, 0, 0);
        assert!(sim.submit_attack(p, near).unwrap());
        // Cooling down.
        assert!(!sim.submit_attack(p, near).unwrap());
        assert_eq!(sim.projectiles().count(), 1);
    }

    #[test]
    fn test_out_of_world_commands_are_rejected() {
        let mut sim = sim();
        let p = sim.add_player("a");

        let huge_move = ObserverCommand::Move {
            player: p,
            direction: Vec3Fixed::from_ints(60_000, 0, 0),
        };
        assert!(matches!(sim.apply_command(huge_move), Err(GameError::InvalidCommand(_))));
        assert!(sim.player(p).unwrap().intent.is_zero());

        let far_attack = ObserverCommand::Attack {
            player: p,
            target_position: Vec3Fixed::from_ints(60_000, 0, 0),
        };
        assert!(matches!(sim.apply_command(far_attack), Err(GameError::InvalidCommand(_))));
        // Would wrap back inside range with unchecked squares.
        assert!(sim.submit_attack(p, Vec3Fixed::from_ints(65_536, 0, 0)).is_err());
        assert_eq!(sim.projectiles().count(), 0);

        sim.apply_command(ObserverCommand::Move {
            player: p,
            direction: Vec3Fixed::from_ints(3, 0, 4),
        })
        .unwrap();
        let intent = sim.player(p).unwrap().intent;
        assert!((intent.length() - Fixed::from_num(1)).abs() < Fixed::from_num(0.001));
        sim.tick();
        assert!(sim.player(p).unwrap().is_alive());
    }

    #[test]
    fn test_spent_bomber_is_not_a_target() {
        let mut sim = sim();
        let p = sim.add_player("a");
        let b = sim
            .spawn_enemy("bomber", Vec3Fixed::from_ints(0, 0, 30), Fixed::from_num(1))
            .unwrap();
        assert_eq!(
            sim.nearest_enemy(Vec3Fixed::ZERO, Fixed::from_num(100)),
            Some(Vec3Fixed::from_ints(0, 0, 30))
        );

        assert!(sim.trigger_explosion(b).unwrap());
        assert!(!sim.enemy(b).unwrap().is_targetable());
        assert_eq!(sim.nearest_enemy(Vec3Fixed::ZERO, Fixed::from_num(100)), None);

        let event = sim.hurt_enemy(b, 100, Some(p)).unwrap();
        assert!(!event.died);
        assert_eq!(event.damage, 0);
        assert_eq!(sim.player(p).unwrap().kills, 0);
    }

    #[test]
    fn test_player_projectile_hits_enemy() {
        let mut sim = sim();
        let p = sim.add_player("a");
        let e = sim
            .spawn_enemy("slime", Vec3Fixed::from_ints(0, 0, 4), Fixed::from_num(1))
            .unwrap();
        // Keep the slime from closing in.
        sim.enemies.get_mut(&e).unwrap().template = Arc::new(
            ArchetypeTemplate::new("statue", ArchetypeKind::Melee).with_speed(Fixed::ZERO),
        );
        assert!(sim.submit_attack(p, Vec3Fixed::from_ints(0, 0, 4)).unwrap());

        let mut hit = false;
        for _ in 0..20 {
            let events = sim.tick();
            if events.combat.iter().any(|c| c.target == e && c.damage == 1) {
                hit = true;
                break;
            }
        }
        assert!(hit);
        assert_eq!(sim.enemy(e).unwrap().health.current, 4);
        assert_eq!(sim.projectiles().count(), 0);
    }

    #[test]
    fn test_projectile_expires() {
        let mut sim = sim();
        let p = sim.add_player("a");
        sim.submit_attack(p, Vec3Fixed::from_ints(0, 0, 5)).unwrap();
        for _ in 0..(5 * TICK_RATE) {
            sim.tick();
        }
        assert_eq!(sim.projectiles().count(), 0);
        assert!(!sim.timers().is_pending(2, TimerKind::ProjectileExpire));
    }

    #[test]
    fn test_jump_only_when_grounded() {
        let mut sim = sim();
        let p = sim.add_player("a");
        sim.apply_command(ObserverCommand::Jump { player: p }).unwrap();
        sim.tick();
        let y1 = sim.player(p).unwrap().position().y;
        assert!(y1 > Fixed::ZERO);

        // Mid-air: request is consumed without effect.
        sim.apply_command(ObserverCommand::Jump { player: p }).unwrap();
        sim.tick();
        let vy = sim.player(p).unwrap().motion.vertical_velocity;
        assert!(vy < Fixed::from_num(5));

        for _ in 0..40 {
            sim.tick();
        }
        let player = sim.player(p).unwrap();
        assert!(player.motion.grounded);
        assert_eq!(player.position().y, Fixed::ZERO);
    }

    #[test]
    fn test_fall_off_arena_is_lethal() {
        let mut config = quiet_config();
        config.arena = crate::arena::Arena::flat(Fixed::from_num(1));
        let mut sim = Simulation::new(config, WaveCatalog::empty(), &ArchetypeRegistry::builtin());
        let p = sim.add_player("a");
        sim.apply_command(ObserverCommand::Move {
            player: p,
            direction: Vec3Fixed::from_ints(1, 0, 0),
        })
        .unwrap();

        for _ in 0..200 {
            sim.tick();
        }
        assert!(sim.player(p).unwrap().died);
    }

    #[test]
    fn test_leave_keeps_kills_in_summary() {
        let mut sim = sim();
        let p = sim.add_player("a");
        let q = sim.add_player("b");
        let e = sim
            .spawn_enemy("slime", Vec3Fixed::from_ints(5, 0, 5), Fixed::from_num(1))
            .unwrap();
        sim.hurt_enemy(e, 100, Some(p)).unwrap();
        sim.apply_command(ObserverCommand::Leave { player: p }).unwrap();

        let summary = sim.summary_now();
        assert_eq!(summary.kills.len(), 2);
        assert_eq!(summary.kills[0].player, p);
        assert_eq!(summary.kills[0].kills, 1);
        assert_eq!(summary.kills[1].player, q);
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let catalog = WaveCatalog::new(vec![WaveDefinition {
            name: "One".into(),
            composition: WaveComposition::Groups(vec![EnemyGroup {
                archetype: "sniper".into(),
                count: 2,
            }]),
            spawn_interval: Fixed::from_num(0.5),
            health_multiplier: Fixed::from_num(1),
            spawn_rate_multiplier: Fixed::from_num(1),
        }]);
        let mut config = quiet_config();
        config.warmup_seconds = Fixed::from_num(1);
        let mut sim = Simulation::new(config, catalog, &ArchetypeRegistry::builtin());
        sim.add_player("a");
        for _ in 0..40 {
            sim.tick();
        }

        let snapshot = sim.snapshot();
        let decoded = WorldSnapshot::decode(&snapshot.encode().unwrap()).unwrap();
        assert_eq!(decoded, snapshot);
        assert!(!decoded.enemies.is_empty());
    }
}
