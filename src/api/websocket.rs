use crate::coordinator::TrackingCoordinator;
use crate::subscription::{ConnectionManager, ConnectionRole, SubscriptionRegistry};
use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Query parameters for WebSocket upgrade.
///
/// Token verification is the auth collaborator's job; by the time a request
/// reaches this handler the principal is trusted. The transport only needs
/// the identity and the role it grants.
#[derive(Deserialize)]
pub struct WsQuery {
    /// Authenticated identity; doubles as the agent id for agent roles
    pub principal: String,
    #[serde(default)]
    pub role: WsRole,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WsRole {
    Agent,
    #[default]
    Observer,
}

impl From<WsRole> for ConnectionRole {
    fn from(role: WsRole) -> Self {
        match role {
            WsRole::Agent => ConnectionRole::Agent,
            WsRole::Observer => ConnectionRole::Observer,
        }
    }
}

/// Shared application state for WebSocket handler
#[derive(Clone)]
pub struct WsAppState {
    pub coordinator: Arc<TrackingCoordinator>,
    pub registry: Arc<SubscriptionRegistry>,
}

/// GET /api/ws - WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<WsAppState>>,
) -> Response {
    info!(principal = %params.principal, "WebSocket upgrade request received");
    ws.on_upgrade(move |socket| handle_socket(socket, state, params))
}

/// Create WebSocket router
pub fn create_ws_router(state: Arc<WsAppState>) -> Router {
    Router::new()
        .route("/api/ws", get(ws_handler))
        .with_state(state)
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<WsAppState>, params: WsQuery) {
    let manager = ConnectionManager::new(
        params.principal,
        params.role.into(),
        Arc::clone(&state.registry),
        Arc::clone(&state.coordinator),
    );

    manager.handle(socket).await;
}
