use crate::eta::EtaResult;
use crate::update::PositionUpdate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Client → Server message types
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Position report from an agent connection. The agent identity comes
    /// from the connection principal, never from this payload.
    #[serde(rename = "location:update")]
    LocationUpdate {
        latitude: f64,
        longitude: f64,
        #[serde(rename = "orderId")]
        #[serde(default)]
        order_id: Option<String>,
        /// Producer observation time; defaults to receipt time when absent
        #[serde(rename = "observedAt")]
        #[serde(default)]
        observed_at: Option<DateTime<Utc>>,
    },
    /// Subscribe this connection to one order's topic
    #[serde(rename = "track:order")]
    TrackOrder {
        #[serde(rename = "orderId")]
        order_id: String,
    },
    /// Unsubscribe this connection from one order's topic
    #[serde(rename = "untrack:order")]
    UntrackOrder {
        #[serde(rename = "orderId")]
        order_id: String,
    },
}

/// Server → Client: enriched position update for observers of an order
#[derive(Debug, Clone, Serialize)]
pub struct DriverLocationMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(rename = "agentId")]
    pub agent_id: String,
    pub location: LocationPayload,
    pub eta: EtaResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationPayload {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "observedAt")]
    pub observed_at: DateTime<Utc>,
}

impl DriverLocationMessage {
    pub fn new(update: &PositionUpdate, eta: EtaResult) -> Self {
        Self {
            msg_type: "driver:location".to_string(),
            agent_id: update.agent_id.clone(),
            location: LocationPayload {
                latitude: update.latitude,
                longitude: update.longitude,
                observed_at: update.observed_at,
            },
            eta,
        }
    }
}

/// Server → Client: Error message
#[derive(Debug, Clone, Serialize)]
pub struct ErrorMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub error: String,
}

impl ErrorMessage {
    pub fn new(error: String) -> Self {
        Self {
            msg_type: "error".to_string(),
            error,
        }
    }
}
