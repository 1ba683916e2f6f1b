use dashmap::DashMap;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

/// Channel end used to deliver serialized payloads to one observer.
pub type ObserverSender = mpsc::UnboundedSender<String>;

/// Topic key for one tracked order.
pub fn order_topic(order_id: &str) -> String {
    format!("order:{}", order_id)
}

/// Result of one fan-out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BroadcastOutcome {
    /// Observers present when the broadcast started
    pub attempted: usize,
    /// Sends that succeeded
    pub delivered: usize,
    /// Dead handles removed during the broadcast
    pub pruned: usize,
}

/// Per-topic observer sets with one-to-many fan-out.
///
/// Topics are created lazily on first join and deleted as soon as their
/// observer set empties; a topic never exists with zero observers.
/// Synchronization is per-topic (one map entry), so join/leave/broadcast on
/// unrelated orders never contend. Successive broadcasts to the same topic
/// are emitted in order; no ordering is promised across topics.
pub struct SubscriptionRegistry {
    topics: DashMap<String, HashMap<Uuid, ObserverSender>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            topics: DashMap::new(),
        }
    }

    /// Add an observer to a topic. Idempotent: joining twice with the same
    /// observer id keeps a single membership.
    pub fn join(&self, topic: &str, observer: Uuid, sender: ObserverSender) {
        let mut entry = self.topics.entry(topic.to_string()).or_default();
        if entry.insert(observer, sender).is_none() {
            info!(topic = %topic, observer = %observer, "Observer joined topic");
        }
    }

    /// Remove an observer from a topic; deletes the topic if now empty.
    /// Leaving a topic the observer is not in is a no-op.
    pub fn leave(&self, topic: &str, observer: &Uuid) {
        let mut emptied = false;
        if let Some(mut entry) = self.topics.get_mut(topic) {
            if entry.remove(observer).is_some() {
                debug!(topic = %topic, observer = %observer, "Observer left topic");
            }
            emptied = entry.is_empty();
        }
        if emptied {
            self.topics.remove_if(topic, |_, observers| observers.is_empty());
        }
    }

    /// Remove an observer from every topic (connection closed).
    pub fn leave_all(&self, observer: &Uuid) {
        self.topics.retain(|_, observers| {
            observers.remove(observer);
            !observers.is_empty()
        });
    }

    /// Send a payload to every current observer of a topic, independently.
    ///
    /// A failed send means the observer's channel is gone; the handle is
    /// pruned on the spot (self-healing) without affecting delivery to the
    /// others. Pruning may empty the topic, which deletes it.
    pub fn broadcast(&self, topic: &str, payload: &str) -> BroadcastOutcome {
        let mut outcome = BroadcastOutcome::default();
        let mut emptied = false;

        if let Some(mut entry) = self.topics.get_mut(topic) {
            outcome.attempted = entry.len();
            let mut dead = Vec::new();

            for (observer, sender) in entry.iter() {
                if sender.send(payload.to_string()).is_ok() {
                    outcome.delivered += 1;
                } else {
                    dead.push(*observer);
                }
            }

            for observer in &dead {
                entry.remove(observer);
                debug!(topic = %topic, observer = %observer, "Pruned dead observer handle");
            }
            outcome.pruned = dead.len();
            emptied = entry.is_empty();
        }

        if emptied {
            self.topics.remove_if(topic, |_, observers| observers.is_empty());
        }

        outcome
    }

    /// Current observer count for a topic (0 if the topic is absent).
    pub fn observer_count(&self, topic: &str) -> usize {
        self.topics.get(topic).map(|o| o.len()).unwrap_or(0)
    }

    /// Number of live topics.
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> (ObserverSender, mpsc::UnboundedReceiver<String>) {
        mpsc::unbounded_channel()
    }

    #[test]
    fn test_join_creates_topic() {
        let registry = SubscriptionRegistry::new();
        let (tx, _rx) = channel();

        registry.join("order:o1", Uuid::new_v4(), tx);
        assert_eq!(registry.topic_count(), 1);
        assert_eq!(registry.observer_count("order:o1"), 1);
    }

    #[test]
    fn test_join_is_idempotent() {
        let registry = SubscriptionRegistry::new();
        let observer = Uuid::new_v4();
        let (tx, _rx) = channel();

        registry.join("order:o1", observer, tx.clone());
        registry.join("order:o1", observer, tx);
        assert_eq!(registry.observer_count("order:o1"), 1);
    }

    #[test]
    fn test_leave_deletes_empty_topic() {
        let registry = SubscriptionRegistry::new();
        let observer = Uuid::new_v4();
        let (tx, _rx) = channel();

        registry.join("order:o1", observer, tx);
        registry.leave("order:o1", &observer);

        assert_eq!(registry.topic_count(), 0);
        assert_eq!(registry.observer_count("order:o1"), 0);
    }

    #[test]
    fn test_double_leave_is_noop() {
        let registry = SubscriptionRegistry::new();
        let observer = Uuid::new_v4();
        let (tx, _rx) = channel();

        registry.join("order:o1", observer, tx);
        registry.leave("order:o1", &observer);
        registry.leave("order:o1", &observer);
        assert_eq!(registry.topic_count(), 0);
    }

    #[test]
    fn test_broadcast_reaches_all_observers() {
        let registry = SubscriptionRegistry::new();
        let (tx1, mut rx1) = channel();
        let (tx2, mut rx2) = channel();

        registry.join("order:o1", Uuid::new_v4(), tx1);
        registry.join("order:o1", Uuid::new_v4(), tx2);

        let outcome = registry.broadcast("order:o1", "hello");
        assert_eq!(outcome.attempted, 2);
        assert_eq!(outcome.delivered, 2);
        assert_eq!(outcome.pruned, 0);
        assert_eq!(rx1.try_recv().unwrap(), "hello");
        assert_eq!(rx2.try_recv().unwrap(), "hello");
    }

    #[test]
    fn test_broadcast_prunes_dead_handles() {
        let registry = SubscriptionRegistry::new();
        let (tx1, mut rx1) = channel();
        let (tx2, rx2) = channel();

        registry.join("order:o1", Uuid::new_v4(), tx1);
        registry.join("order:o1", Uuid::new_v4(), tx2);
        drop(rx2); // observer 2 disconnected

        let outcome = registry.broadcast("order:o1", "payload");
        assert_eq!(outcome.attempted, 2);
        assert_eq!(outcome.delivered, 1);
        assert_eq!(outcome.pruned, 1);

        // Live observer still got the payload; dead one is gone
        assert_eq!(rx1.try_recv().unwrap(), "payload");
        assert_eq!(registry.observer_count("order:o1"), 1);
    }

    #[test]
    fn test_pruning_last_observer_deletes_topic() {
        let registry = SubscriptionRegistry::new();
        let (tx, rx) = channel();

        registry.join("order:o1", Uuid::new_v4(), tx);
        drop(rx);

        registry.broadcast("order:o1", "payload");
        assert_eq!(registry.topic_count(), 0);
    }

    #[test]
    fn test_broadcast_to_absent_topic() {
        let registry = SubscriptionRegistry::new();
        let outcome = registry.broadcast("order:missing", "payload");
        assert_eq!(outcome, BroadcastOutcome::default());
    }

    #[test]
    fn test_broadcasts_ordered_within_topic() {
        let registry = SubscriptionRegistry::new();
        let (tx, mut rx) = channel();

        registry.join("order:o1", Uuid::new_v4(), tx);
        registry.broadcast("order:o1", "first");
        registry.broadcast("order:o1", "second");

        assert_eq!(rx.try_recv().unwrap(), "first");
        assert_eq!(rx.try_recv().unwrap(), "second");
    }

    #[test]
    fn test_leave_all_across_topics() {
        let registry = SubscriptionRegistry::new();
        let observer = Uuid::new_v4();
        let (tx, _rx) = channel();
        let (other_tx, _other_rx) = channel();

        registry.join("order:o1", observer, tx.clone());
        registry.join("order:o2", observer, tx);
        registry.join("order:o2", Uuid::new_v4(), other_tx);

        registry.leave_all(&observer);

        // o1 emptied and deleted; o2 survives with its other observer
        assert_eq!(registry.topic_count(), 1);
        assert_eq!(registry.observer_count("order:o2"), 1);
    }

    #[test]
    fn test_topics_are_independent() {
        let registry = SubscriptionRegistry::new();
        let (tx1, mut rx1) = channel();
        let (tx2, mut rx2) = channel();

        registry.join("order:o1", Uuid::new_v4(), tx1);
        registry.join("order:o2", Uuid::new_v4(), tx2);

        registry.broadcast("order:o1", "for-o1");

        assert_eq!(rx1.try_recv().unwrap(), "for-o1");
        assert!(rx2.try_recv().is_err());
    }

    #[test]
    fn test_order_topic_key() {
        assert_eq!(order_topic("o1"), "order:o1");
    }
}
