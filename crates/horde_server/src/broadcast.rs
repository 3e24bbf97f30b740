//! Replication fan-out over a tokio broadcast channel.
//!
//! The authority never waits on observers: sends fail silently when
//! nobody is listening, and a receiver that falls more than the
//! channel capacity behind skips ahead with `RecvError::Lagged`.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use horde_core::replication::{ReplicationEvent, StateObserver};

/// A replication event stamped with its tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickedEvent {
    /// Tick that produced the event.
    pub tick: u64,
    /// The change.
    pub event: ReplicationEvent,
}

/// [`StateObserver`] that forwards every event into a broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastObserver {
    sender: broadcast::Sender<TickedEvent>,
}

impl BroadcastObserver {
    /// Wrap an existing sender.
    #[must_use]
    pub const fn new(sender: broadcast::Sender<TickedEvent>) -> Self {
        Self { sender }
    }

    /// Create a channel with `capacity` and the observer feeding it.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, broadcast::Sender<TickedEvent>) {
        let (sender, _) = broadcast::channel(capacity);
        (Self::new(sender.clone()), sender)
    }
}

impl StateObserver for BroadcastObserver {
    fn observe(&mut self, tick: u64, event: &ReplicationEvent) {
        // No receivers is fine: events are fire-and-forget.
        let _ = self.sender.send(TickedEvent {
            tick,
            event: event.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_reach_subscribers() {
        let (mut observer, sender) = BroadcastObserver::channel(8);
        let mut rx = sender.subscribe();

        observer.observe(3, &ReplicationEvent::DamageFlash { entity: 7 });
        let received = rx.recv().await.unwrap();
        assert_eq!(received.tick, 3);
        assert_eq!(received.event, ReplicationEvent::DamageFlash { entity: 7 });
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags_without_blocking() {
        let (mut observer, sender) = BroadcastObserver::channel(2);
        let mut rx = sender.subscribe();

        for tick in 0..5 {
            observer.observe(tick, &ReplicationEvent::DamageFlash { entity: 1 });
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(3))
        ));
        assert_eq!(rx.recv().await.unwrap().tick, 3);
    }

    #[test]
    fn test_send_without_receivers_is_ignored() {
        let (mut observer, _sender) = BroadcastObserver::channel(4);
        observer.observe(0, &ReplicationEvent::EnemyRemoved { entity: 2 });
    }
}
