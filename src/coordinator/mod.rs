use crate::eta::{EtaEstimator, EtaResult};
use crate::store::{HistoryEntry, HotLocationStore, LocationHistoryStore, WriteOutcome};
use crate::subscription::protocol::DriverLocationMessage;
use crate::subscription::registry::{order_topic, BroadcastOutcome, SubscriptionRegistry};
use crate::update::{PositionUpdate, ValidationError};
use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, error, warn};

mod resolver;

pub use resolver::{DestinationResolver, HttpDestinationResolver};

/// What happened to one update after validation.
///
/// Everything past validation is an isolated failure domain, so partial
/// success (history write failed, cache write and broadcast succeeded) is
/// the expected degraded mode, not a coordinator-level failure.
#[derive(Clone, Debug)]
pub struct UpdateOutcome {
    /// Hot-store result: applied, or rejected as older than the resident
    pub hot_write: WriteOutcome,
    /// False if the history append failed (logged, retryable)
    pub history_persisted: bool,
    /// Present only when the update carried an order association
    pub eta: Option<EtaResult>,
    /// Present only when a broadcast was attempted
    pub broadcast: Option<BroadcastOutcome>,
}

/// Orchestrates the tracking pipeline for inbound position updates.
///
/// Data flow: validate → { hot write, history append } → ETA (when an order
/// is associated) → fan-out to `order:{id}`. Stores and registry are
/// injected; their lifecycles belong to process bootstrap.
pub struct TrackingCoordinator {
    hot: Arc<HotLocationStore>,
    history: Arc<LocationHistoryStore>,
    registry: Arc<SubscriptionRegistry>,
    estimator: EtaEstimator,
    resolver: Arc<dyn DestinationResolver>,
    ttl: Duration,
}

impl TrackingCoordinator {
    pub fn new(
        hot: Arc<HotLocationStore>,
        history: Arc<LocationHistoryStore>,
        registry: Arc<SubscriptionRegistry>,
        estimator: EtaEstimator,
        resolver: Arc<dyn DestinationResolver>,
        ttl: Duration,
    ) -> Self {
        Self {
            hot,
            history,
            registry,
            estimator,
            resolver,
            ttl,
        }
    }

    /// Process one inbound position update.
    ///
    /// Only `ValidationError` aborts the update, and it does so before any
    /// side effect. Each later step is contained at its own boundary.
    pub async fn handle_update(
        &self,
        update: PositionUpdate,
    ) -> Result<UpdateOutcome, ValidationError> {
        update.validate()?;

        // Both tiers are attempted regardless of each other's outcome.
        let hot_write = self.hot.write(&update, self.ttl);
        if hot_write == WriteOutcome::SupersededByNewer {
            debug!(agent_id = %update.agent_id, "Hot write superseded by newer observation");
        }

        let history_persisted = self.append_history(&update).await;

        let mut eta = None;
        let mut broadcast = None;

        if let Some(order_id) = update.order_id.as_deref() {
            // Destination resolution is the order service's responsibility;
            // an unresolved destination degrades the ETA, never the update.
            let destination = self.resolver.destination(order_id).await;
            let result = self.estimator.estimate(Some(update.point()), destination).await;
            eta = Some(result);

            let message = DriverLocationMessage::new(&update, result);
            match serde_json::to_string(&message) {
                Ok(payload) => {
                    let outcome = self.registry.broadcast(&order_topic(order_id), &payload);
                    if outcome.pruned > 0 {
                        warn!(
                            order_id = %order_id,
                            pruned = outcome.pruned,
                            "Pruned dead observers during broadcast"
                        );
                    }
                    broadcast = Some(outcome);
                }
                Err(e) => {
                    error!(error = %e, "Failed to serialize driver location message");
                }
            }
        }

        Ok(UpdateOutcome {
            hot_write,
            history_persisted,
            eta,
            broadcast,
        })
    }

    /// Append to the durable history without parking the async path on
    /// SQLite I/O. Failure is logged and surfaced in the outcome only.
    async fn append_history(&self, update: &PositionUpdate) -> bool {
        let entry = HistoryEntry::from_update(update);
        let history = Arc::clone(&self.history);
        let agent_id = update.agent_id.clone();

        match tokio::task::spawn_blocking(move || history.append(&entry)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                error!(agent_id = %agent_id, error = %e, "History append failed");
                false
            }
            Err(e) => {
                error!(agent_id = %agent_id, error = %e, "History append task panicked");
                false
            }
        }
    }

    /// Latest non-expired position for an agent.
    pub fn current_location(&self, agent_id: &str) -> Option<crate::store::HotLocationRecord> {
        self.hot.read(agent_id)
    }
}
