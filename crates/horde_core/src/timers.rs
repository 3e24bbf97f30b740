//! Tick-keyed timer wheel for timed entity behaviors.
//!
//! Cooldowns, hop cycles, projectile lifetimes and explosion cleanup
//! are all "do X to entity N at tick T". Entries are keyed by due tick
//! and a sequence number so entries due on the same tick fire in
//! scheduling order. Destroying an entity must call
//! [`TimerWheel::cancel_owner`]; the authority also re-checks that the
//! owner exists when an entry fires.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::EntityId;

/// What a timer does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimerKind {
    /// Enemy melee strike or sniper shot is off cooldown.
    WeaponReady,
    /// Enemy may hop again.
    HopReady,
    /// Projectile lifetime ran out.
    ProjectileExpire,
    /// Exploded bomber is removed.
    ExplosionCleanup,
}

/// A scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerEntry {
    /// Tick on which the timer fires.
    pub due: u64,
    /// Entity the timer belongs to.
    pub owner: EntityId,
    /// Action to take.
    pub kind: TimerKind,
}

/// Ordered set of pending timers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerWheel {
    entries: BTreeMap<(u64, u64), TimerEntry>,
    next_seq: u64,
}

impl TimerWheel {
    /// Create an empty wheel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `kind` for `owner` on tick `due`.
    pub fn schedule(&mut self, due: u64, owner: EntityId, kind: TimerKind) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert((due, seq), TimerEntry { due, owner, kind });
    }

    /// Drop every timer owned by `owner`, returning how many were removed.
    pub fn cancel_owner(&mut self, owner: EntityId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.owner != owner);
        before - self.entries.len()
    }

    /// Whether `owner` has a pending timer of `kind`.
    #[must_use]
    pub fn is_pending(&self, owner: EntityId, kind: TimerKind) -> bool {
        self.entries
            .values()
            .any(|entry| entry.owner == owner && entry.kind == kind)
    }

    /// Remove and return every timer due on or before `now`, in firing order.
    pub fn drain_due(&mut self, now: u64) -> Vec<TimerEntry> {
        let pending = self.entries.split_off(&(now.saturating_add(1), 0));
        let due = std::mem::replace(&mut self.entries, pending);
        due.into_values().collect()
    }

    /// Number of pending timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no timers are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
