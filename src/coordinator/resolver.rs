use crate::geo::Point;
use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::warn;

/// Order destination lookup capability.
///
/// Destination resolution belongs to the order service; the tracking core
/// only consumes it. `None` means the destination could not be resolved,
/// which sends ETA estimation to its last-resort default.
pub trait DestinationResolver: Send + Sync {
    fn destination(&self, order_id: &str) -> BoxFuture<'_, Option<Point>>;
}

/// Resolves order destinations from the order service over HTTP.
pub struct HttpDestinationResolver {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct DestinationResponse {
    latitude: f64,
    longitude: f64,
}

impl HttpDestinationResolver {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }
}

impl DestinationResolver for HttpDestinationResolver {
    fn destination(&self, order_id: &str) -> BoxFuture<'_, Option<Point>> {
        let url = format!("{}/api/orders/{}/destination", self.base_url, order_id);
        Box::pin(async move {
            let response = match self.client.get(&url).send().await {
                Ok(r) => r,
                Err(e) => {
                    warn!(url = %url, error = %e, "Destination lookup request failed");
                    return None;
                }
            };

            if !response.status().is_success() {
                warn!(url = %url, status = %response.status(), "Destination lookup rejected");
                return None;
            }

            match response.json::<DestinationResponse>().await {
                Ok(dest) => Some(Point::new(dest.latitude, dest.longitude)),
                Err(e) => {
                    warn!(url = %url, error = %e, "Destination response malformed");
                    None
                }
            }
        })
    }
}
