use crate::geo::{self, Point};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

mod provider;

pub use provider::{HttpRoutingProvider, RoutingProvider};

/// How an ETA value was produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EtaSource {
    /// Traffic-aware duration from the external routing provider
    External,
    /// Great-circle distance divided by the assumed average speed
    FallbackDistance,
    /// Last-resort constant: origin or destination could not be resolved
    Default,
}

/// Estimated remaining travel time. Computed per request, never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EtaResult {
    pub seconds: u32,
    pub source: EtaSource,
}

/// Travel-time estimator with a resilient fallback path.
///
/// The external provider call is bounded by a timeout and every failure mode
/// (error, timeout, missing traffic duration) degrades to the deterministic
/// distance fallback. Estimation never returns an error to its caller.
pub struct EtaEstimator {
    provider: Arc<dyn RoutingProvider>,
    timeout: Duration,
    average_speed_kmh: f64,
    default_seconds: u32,
}

impl EtaEstimator {
    pub fn new(
        provider: Arc<dyn RoutingProvider>,
        timeout: Duration,
        average_speed_kmh: f64,
        default_seconds: u32,
    ) -> Self {
        Self {
            provider,
            timeout,
            average_speed_kmh,
            default_seconds,
        }
    }

    /// Estimate remaining travel time between origin and destination.
    ///
    /// Returns the configured default (tagged `EtaSource::Default`) only when
    /// either position is unresolvable, kept distinguishable from a computed
    /// distance fallback so operators can tell "no data" from "degraded".
    pub async fn estimate(&self, origin: Option<Point>, destination: Option<Point>) -> EtaResult {
        let (origin, destination) = match (origin, destination) {
            (Some(o), Some(d)) => (o, d),
            _ => {
                debug!("Origin or destination unresolved, returning default ETA");
                return EtaResult {
                    seconds: self.default_seconds,
                    source: EtaSource::Default,
                };
            }
        };

        match tokio::time::timeout(self.timeout, self.provider.traffic_duration(origin, destination))
            .await
        {
            Ok(Ok(Some(seconds))) => EtaResult {
                seconds,
                source: EtaSource::External,
            },
            Ok(Ok(None)) => {
                debug!("Provider response lacked a traffic-aware duration, using distance fallback");
                self.distance_fallback(origin, destination)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Routing provider failed, using distance fallback");
                self.distance_fallback(origin, destination)
            }
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "Routing provider timed out, using distance fallback");
                self.distance_fallback(origin, destination)
            }
        }
    }

    /// Deterministic local estimate: great-circle km at the assumed average
    /// speed, in whole seconds.
    fn distance_fallback(&self, origin: Point, destination: Point) -> EtaResult {
        let km = geo::distance_km(origin, destination);
        let seconds = (km / self.average_speed_kmh * 3600.0).round() as u32;
        EtaResult {
            seconds,
            source: EtaSource::FallbackDistance,
        }
    }
}
