use crate::geo::Point;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod validation;
#[cfg(test)]
mod tests;

pub use validation::{validate, ValidationError};

/// A single inbound position report from a tracked agent.
///
/// Immutable once constructed. The agent identity comes from the
/// authenticated principal at the transport boundary, never from the
/// client payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PositionUpdate {
    /// Opaque agent identity (e.g., a driver id)
    #[serde(rename = "agentId")]
    pub agent_id: String,

    /// Degrees, must be within [-90, 90]
    pub latitude: f64,

    /// Degrees, must be within [-180, 180]
    pub longitude: f64,

    /// Producer-side observation time; drives last-write-wins ordering
    #[serde(rename = "observedAt")]
    pub observed_at: DateTime<Utc>,

    /// Order this update is associated with, if the agent is on a delivery
    #[serde(rename = "orderId")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
}

impl PositionUpdate {
    pub fn point(&self) -> Point {
        Point::new(self.latitude, self.longitude)
    }

    /// Validates coordinate ranges and agent identity.
    ///
    /// Returns Ok(()) if valid, Err(ValidationError) otherwise. Must be
    /// called before the update reaches any store.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate(self)
    }
}
