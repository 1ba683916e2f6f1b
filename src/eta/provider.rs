use crate::geo::Point;
use anyhow::{anyhow, Context, Result};
use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::debug;

/// External routing provider seam.
///
/// `Ok(Some(seconds))` is a usable traffic-aware duration; `Ok(None)` means
/// the provider answered but without one. Either error or `None` sends the
/// estimator down the fallback path.
pub trait RoutingProvider: Send + Sync {
    fn traffic_duration(
        &self,
        origin: Point,
        destination: Point,
    ) -> BoxFuture<'_, Result<Option<u32>>>;
}

/// Distance-matrix style routing client.
///
/// Calls a Google Distance Matrix compatible endpoint with live-traffic
/// parameters and extracts `duration_in_traffic` from the first element.
pub struct HttpRoutingProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct MatrixResponse {
    #[serde(default)]
    rows: Vec<MatrixRow>,
}

#[derive(Deserialize)]
struct MatrixRow {
    #[serde(default)]
    elements: Vec<MatrixElement>,
}

#[derive(Deserialize)]
struct MatrixElement {
    #[serde(default)]
    duration_in_traffic: Option<DurationValue>,
}

#[derive(Deserialize)]
struct DurationValue {
    value: u32,
}

impl HttpRoutingProvider {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }
}

impl RoutingProvider for HttpRoutingProvider {
    fn traffic_duration(
        &self,
        origin: Point,
        destination: Point,
    ) -> BoxFuture<'_, Result<Option<u32>>> {
        Box::pin(async move {
            let mut query = vec![
                (
                    "origins",
                    format!("{},{}", origin.latitude, origin.longitude),
                ),
                (
                    "destinations",
                    format!("{},{}", destination.latitude, destination.longitude),
                ),
                ("mode", "driving".to_string()),
                ("departure_time", "now".to_string()),
                ("traffic_model", "best_guess".to_string()),
            ];
            if let Some(key) = &self.api_key {
                query.push(("key", key.clone()));
            }

            debug!(url = %self.base_url, "Requesting traffic-aware route duration");

            let response = self
                .client
                .get(&self.base_url)
                .query(&query)
                .send()
                .await
                .context("Failed to send routing request")?;

            if !response.status().is_success() {
                return Err(anyhow!(
                    "Routing provider returned status {}",
                    response.status()
                ));
            }

            let body: MatrixResponse = response
                .json()
                .await
                .context("Failed to parse routing response")?;

            Ok(body
                .rows
                .first()
                .and_then(|row| row.elements.first())
                .and_then(|element| element.duration_in_traffic.as_ref())
                .map(|duration| duration.value))
        })
    }
}
