use crate::geo::{self, Point};
use crate::store::{HotLocationRecord, HotLocationStore};
use serde::Serialize;
use std::sync::Arc;

/// Radius used when a nearby query does not specify one.
pub const DEFAULT_RADIUS_KM: f64 = 10.0;

/// One agent within range of a reference point.
#[derive(Clone, Debug, Serialize)]
pub struct NearbyAgent {
    #[serde(rename = "agentId")]
    pub agent_id: String,
    pub record: HotLocationRecord,
    #[serde(rename = "distanceKm")]
    pub distance_km: f64,
}

/// Proximity search over the hot store.
///
/// Linear scan by contract: every non-expired record is measured against the
/// reference point. Callers may rely only on the sorted-by-distance output,
/// never on scan order, so a spatial index can replace the scan internally
/// without changing this interface. Read-only; never mutates the store.
pub struct NearbyQueryEngine {
    hot: Arc<HotLocationStore>,
}

impl NearbyQueryEngine {
    pub fn new(hot: Arc<HotLocationStore>) -> Self {
        Self { hot }
    }

    /// Agents within `radius_km` of `reference`, ascending by distance.
    pub fn find_nearby(&self, reference: Point, radius_km: f64) -> Vec<NearbyAgent> {
        let mut results: Vec<NearbyAgent> = self
            .hot
            .scan()
            .into_iter()
            .filter_map(|record| {
                let distance_km = geo::distance_km(reference, record.point());
                (distance_km <= radius_km).then(|| NearbyAgent {
                    agent_id: record.agent_id.clone(),
                    record,
                    distance_km,
                })
            })
            .collect();

        results.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        results
    }
}
