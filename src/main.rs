use anyhow::{Context, Result};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};
use waypoint::api::{create_query_router, create_ws_router, QueryAppState, WsAppState};
use waypoint::config::{load_config, WaypointConfig};
use waypoint::coordinator::{HttpDestinationResolver, TrackingCoordinator};
use waypoint::eta::{EtaEstimator, HttpRoutingProvider};
use waypoint::nearby::NearbyQueryEngine;
use waypoint::store::{HotLocationStore, LocationHistoryStore};
use waypoint::subscription::SubscriptionRegistry;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "waypoint=info".into()),
        )
        .init();

    info!("Waypoint starting...");

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = match load_config(&config_path) {
        Ok(config) => {
            info!(path = %config_path, "Loaded configuration");
            config
        }
        Err(e) => {
            warn!(path = %config_path, error = %e, "Config not loaded, using defaults");
            WaypointConfig::default()
        }
    };

    // Store lifecycles are owned here and injected everywhere else
    let hot = Arc::new(HotLocationStore::new());
    let history = Arc::new(
        LocationHistoryStore::open(&config.history.path)
            .context("Failed to open history store")?,
    );
    info!(path = %config.history.path, "History store ready");

    let registry = Arc::new(SubscriptionRegistry::new());

    let provider = Arc::new(HttpRoutingProvider::new(
        config.eta.routing_url.clone(),
        config.eta.api_key.clone(),
    ));
    let estimator = EtaEstimator::new(
        provider,
        std::time::Duration::from_millis(config.eta.provider_timeout_ms),
        config.eta.average_speed_kmh,
        config.eta.default_eta_seconds,
    );

    let resolver = Arc::new(HttpDestinationResolver::new(config.orders.service_url.clone()));

    let coordinator = Arc::new(TrackingCoordinator::new(
        Arc::clone(&hot),
        Arc::clone(&history),
        Arc::clone(&registry),
        estimator,
        resolver,
        chrono::Duration::seconds(config.hot.ttl_seconds),
    ));

    // Periodic sweeper keeps hot-store scans cheap; reads already filter
    // expired records, so this is purely housekeeping.
    let sweep_store = Arc::clone(&hot);
    let sweep_interval = config.hot.sweep_interval_seconds;
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(sweep_interval.max(1)));
        loop {
            interval.tick().await;
            let purged = sweep_store.purge_expired();
            if purged > 0 {
                debug!(purged = purged, "Swept expired hot records");
            }
        }
    });

    let ws_state = Arc::new(WsAppState {
        coordinator: Arc::clone(&coordinator),
        registry: Arc::clone(&registry),
    });
    let query_state = Arc::new(QueryAppState {
        coordinator: Arc::clone(&coordinator),
        history: Arc::clone(&history),
        nearby: Arc::new(NearbyQueryEngine::new(Arc::clone(&hot))),
    });

    let app = create_ws_router(ws_state)
        .merge(create_query_router(query_state))
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.api.bind_addr)
        .await
        .context("Failed to bind API listener")?;
    info!(addr = %config.api.bind_addr, "Waypoint listening");

    axum::serve(listener, app)
        .await
        .context("API server exited")?;

    Ok(())
}
