use crate::geo::Point;
use crate::update::PositionUpdate;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;

/// Latest known position of one agent, with a bounded lifetime.
///
/// Absence after expiry means "agent presumed offline", not an error.
#[derive(Clone, Debug, Serialize)]
pub struct HotLocationRecord {
    #[serde(rename = "agentId")]
    pub agent_id: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "observedAt")]
    pub observed_at: DateTime<Utc>,
    #[serde(rename = "orderId")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip)]
    pub expires_at: DateTime<Utc>,
}

impl HotLocationRecord {
    pub fn point(&self) -> Point {
        Point::new(self.latitude, self.longitude)
    }

    fn expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Result of a hot-store write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Record stored (new agent, newer observation, or expired resident)
    Applied,
    /// A newer observation is already stored; the write was rejected
    SupersededByNewer,
}

/// Ephemeral latest-position cache, one record per agent.
///
/// Concurrency model: lock-free map with per-key entry locking only, so
/// distinct agents never contend. Same-agent races resolve by comparing
/// `observed_at` before accepting the write, so a delayed update from the
/// past cannot clobber a newer one already stored. Expired records are
/// filtered at read time; `purge_expired` exists so a periodic sweeper can
/// keep `scan` cheap.
pub struct HotLocationStore {
    records: DashMap<String, HotLocationRecord>,
}

impl HotLocationStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Store the update's position with the given TTL.
    ///
    /// Last-write-wins by `observed_at`, not arrival order: only a strictly
    /// older observation loses to the resident record. An expired resident
    /// loses to any write.
    pub fn write(&self, update: &PositionUpdate, ttl: Duration) -> WriteOutcome {
        let now = Utc::now();
        let record = HotLocationRecord {
            agent_id: update.agent_id.clone(),
            latitude: update.latitude,
            longitude: update.longitude,
            observed_at: update.observed_at,
            order_id: update.order_id.clone(),
            expires_at: now + ttl,
        };

        match self.records.entry(update.agent_id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(mut entry) => {
                let resident = entry.get();
                if !resident.expired_at(now) && record.observed_at < resident.observed_at {
                    debug!(
                        agent_id = %update.agent_id,
                        incoming = %record.observed_at,
                        resident = %resident.observed_at,
                        "Rejected stale position write"
                    );
                    return WriteOutcome::SupersededByNewer;
                }
                entry.insert(record);
                WriteOutcome::Applied
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(record);
                WriteOutcome::Applied
            }
        }
    }

    /// Latest non-expired record for an agent.
    pub fn read(&self, agent_id: &str) -> Option<HotLocationRecord> {
        let now = Utc::now();
        self.records
            .get(agent_id)
            .filter(|r| !r.expired_at(now))
            .map(|r| r.clone())
    }

    /// Snapshot of all non-expired records.
    pub fn scan(&self) -> Vec<HotLocationRecord> {
        let now = Utc::now();
        self.records
            .iter()
            .filter(|r| !r.expired_at(now))
            .map(|r| r.value().clone())
            .collect()
    }

    /// Drop expired records; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.records.len();
        self.records.retain(|_, r| !r.expired_at(now));
        before - self.records.len()
    }
}

impl Default for HotLocationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn make_update(agent_id: &str, observed_at: DateTime<Utc>) -> PositionUpdate {
        PositionUpdate {
            agent_id: agent_id.to_string(),
            latitude: 40.7128,
            longitude: -74.0060,
            observed_at,
            order_id: None,
        }
    }

    #[test]
    fn test_write_then_read() {
        let store = HotLocationStore::new();
        let update = make_update("d1", Utc::now());

        assert_eq!(store.write(&update, Duration::seconds(300)), WriteOutcome::Applied);

        let record = store.read("d1").unwrap();
        assert_eq!(record.agent_id, "d1");
        assert_eq!(record.observed_at, update.observed_at);
    }

    #[test]
    fn test_read_unknown_agent() {
        let store = HotLocationStore::new();
        assert!(store.read("ghost").is_none());
    }

    #[test]
    fn test_stale_write_rejected() {
        let store = HotLocationStore::new();
        let t2 = Utc::now();
        let t1 = t2 - Duration::seconds(30);

        // T2 arrives first, then the delayed T1
        let newer = make_update("d1", t2);
        let mut older = make_update("d1", t1);
        older.latitude = 41.0;

        assert_eq!(store.write(&newer, Duration::seconds(300)), WriteOutcome::Applied);
        assert_eq!(
            store.write(&older, Duration::seconds(300)),
            WriteOutcome::SupersededByNewer
        );

        // Final state reflects T2's position
        let record = store.read("d1").unwrap();
        assert_eq!(record.observed_at, t2);
        assert_eq!(record.latitude, 40.7128);
    }

    #[test]
    fn test_equal_observed_at_accepted() {
        let store = HotLocationStore::new();
        let t = Utc::now();

        let first = make_update("d1", t);
        let mut second = make_update("d1", t);
        second.latitude = 41.0;

        store.write(&first, Duration::seconds(300));
        assert_eq!(store.write(&second, Duration::seconds(300)), WriteOutcome::Applied);
        assert_eq!(store.read("d1").unwrap().latitude, 41.0);
    }

    #[test]
    fn test_expired_record_is_absent() {
        let store = HotLocationStore::new();
        let update = make_update("d1", Utc::now());

        store.write(&update, Duration::zero());
        assert!(store.read("d1").is_none());
        assert!(store.scan().is_empty());
    }

    #[test]
    fn test_expired_resident_loses_to_older_write() {
        let store = HotLocationStore::new();
        let t2 = Utc::now();
        let t1 = t2 - Duration::seconds(30);

        // Resident record is expired, so even an older observation replaces it
        store.write(&make_update("d1", t2), Duration::zero());
        assert_eq!(
            store.write(&make_update("d1", t1), Duration::seconds(300)),
            WriteOutcome::Applied
        );
        assert_eq!(store.read("d1").unwrap().observed_at, t1);
    }

    #[test]
    fn test_scan_excludes_expired() {
        let store = HotLocationStore::new();
        store.write(&make_update("live", Utc::now()), Duration::seconds(300));
        store.write(&make_update("gone", Utc::now()), Duration::zero());

        let records = store.scan();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].agent_id, "live");
    }

    #[test]
    fn test_purge_expired() {
        let store = HotLocationStore::new();
        store.write(&make_update("live", Utc::now()), Duration::seconds(300));
        store.write(&make_update("gone", Utc::now()), Duration::zero());

        assert_eq!(store.purge_expired(), 1);
        assert!(store.read("live").is_some());
    }

    #[test]
    fn test_concurrent_writers_distinct_agents() {
        let store = Arc::new(HotLocationStore::new());
        let mut handles = vec![];

        for i in 0..10 {
            let store_clone = Arc::clone(&store);
            let handle = thread::spawn(move || {
                let update = make_update(&format!("agent_{}", i), Utc::now());
                store_clone.write(&update, Duration::seconds(300));
            });
            handles.push(handle);
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.scan().len(), 10);
    }

    #[test]
    fn test_concurrent_writes_same_agent_keep_newest() {
        let store = Arc::new(HotLocationStore::new());
        let base = Utc::now();
        let mut handles = vec![];

        for i in 0..10 {
            let store_clone = Arc::clone(&store);
            let handle = thread::spawn(move || {
                let update = make_update("shared", base + Duration::seconds(i));
                store_clone.write(&update, Duration::seconds(300));
            });
            handles.push(handle);
        }

        for handle in handles {
            handle.join().unwrap();
        }

        // Whatever the interleaving, the newest observation survives
        assert_eq!(
            store.read("shared").unwrap().observed_at,
            base + Duration::seconds(9)
        );
    }
}
