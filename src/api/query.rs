use crate::geo::{self, Point};
use crate::nearby::{NearbyAgent, NearbyQueryEngine, DEFAULT_RADIUS_KM};
use crate::store::{HotLocationRecord, LocationHistoryStore, RoutePoint};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

/// Shared state for the read-only query API
pub struct QueryAppState {
    pub coordinator: Arc<crate::coordinator::TrackingCoordinator>,
    pub history: Arc<LocationHistoryStore>,
    pub nearby: Arc<NearbyQueryEngine>,
}

/// Query parameters for proximity search
#[derive(Deserialize)]
pub struct NearbyParams {
    pub latitude: f64,
    pub longitude: f64,
    /// Defaults to 10 km when omitted
    #[serde(rename = "radiusKm")]
    pub radius_km: Option<f64>,
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
}

/// Create query API router
pub fn create_query_router(state: Arc<QueryAppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/agents/nearby", get(get_nearby))
        .route("/api/agents/:id/location", get(get_location))
        .route("/api/agents/:id/route/:order_id", get(get_route))
        .with_state(state)
}

/// GET /health - liveness probe
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "waypoint",
    })
}

/// GET /api/agents/:id/location - latest non-expired position
async fn get_location(
    State(state): State<Arc<QueryAppState>>,
    Path(id): Path<String>,
) -> Result<Json<HotLocationRecord>, QueryError> {
    state
        .coordinator
        .current_location(&id)
        .map(Json)
        .ok_or(QueryError::NotFound)
}

/// GET /api/agents/nearby?latitude=..&longitude=..&radiusKm=..
///
/// Agents within range of the reference point, ascending by distance.
async fn get_nearby(
    State(state): State<Arc<QueryAppState>>,
    Query(params): Query<NearbyParams>,
) -> Result<Json<Vec<NearbyAgent>>, QueryError> {
    if !geo::valid_latitude(params.latitude) || !geo::valid_longitude(params.longitude) {
        return Err(QueryError::BadRequest(
            "latitude/longitude out of range".to_string(),
        ));
    }

    let radius_km = params.radius_km.unwrap_or(DEFAULT_RADIUS_KM);
    if !(radius_km.is_finite() && radius_km >= 0.0) {
        return Err(QueryError::BadRequest("invalid radiusKm".to_string()));
    }

    let reference = Point::new(params.latitude, params.longitude);
    Ok(Json(state.nearby.find_nearby(reference, radius_km)))
}

/// GET /api/agents/:id/route/:order_id - route reconstruction, ascending
/// by recorded time.
async fn get_route(
    State(state): State<Arc<QueryAppState>>,
    Path((id, order_id)): Path<(String, String)>,
) -> Result<Json<Vec<RoutePoint>>, QueryError> {
    let history = Arc::clone(&state.history);

    let points = tokio::task::spawn_blocking(move || history.query_route(&id, &order_id))
        .await
        .map_err(|e| {
            error!(error = %e, "Route query task panicked");
            QueryError::Internal
        })?
        .map_err(|e| {
            error!(error = %e, "Route query failed");
            QueryError::Internal
        })?;

    Ok(Json(points))
}

/// Query error types
#[derive(Debug)]
enum QueryError {
    NotFound,
    BadRequest(String),
    Internal,
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            QueryError::NotFound => (StatusCode::NOT_FOUND, "Agent not found".to_string()),
            QueryError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            QueryError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "History store unavailable".to_string(),
            ),
        };

        let body = Json(ErrorResponse {
            error: error_message,
        });

        (status, body).into_response()
    }
}
