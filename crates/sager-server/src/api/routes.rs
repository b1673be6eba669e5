//! REST API routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::ws;
use crate::state::AppState;
use sager_core::{decode_payload, FeedStatus, TrackedEntity};

/// Create the API router.
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/v1/drones", get(list_drones))
        .route("/v1/drones/:drone_id", get(get_drone))
        .route("/v1/reports", post(ingest_reports))
        .route("/v1/stats", get(get_stats))
        .route("/v1/status", get(get_status))
        .route("/v1/stream", get(ws::ws_handler))
}

// === Request/Response types ===

#[derive(Debug, Deserialize)]
pub struct ListDronesQuery {
    /// Only drones with this classification
    pub authorized: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub accepted: bool,
    pub reports: usize,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub feed: FeedStatus,
    pub feed_configured: bool,
    pub batches_processed: u64,
    pub tracked: usize,
}

// === Handlers ===

async fn list_drones(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListDronesQuery>,
) -> Json<Vec<TrackedEntity>> {
    let snapshot = state.snapshot();
    let drones = snapshot
        .drones
        .iter()
        .filter(|d| query.authorized.map_or(true, |wanted| d.authorized == wanted))
        .cloned()
        .collect();
    Json(drones)
}

async fn get_drone(
    State(state): State<Arc<AppState>>,
    Path(drone_id): Path<String>,
) -> impl IntoResponse {
    let snapshot = state.snapshot();
    match snapshot.get(&drone_id) {
        Some(drone) => (StatusCode::OK, Json(json!(drone))),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "Drone not tracked",
                "drone_id": drone_id
            })),
        ),
    }
}

/// Accept one batch in the feed's wire format.
///
/// Reconciliation happens on the engine task; the reply only confirms the
/// batch was queued. Malformed reports inside the batch are skipped there.
async fn ingest_reports(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> impl IntoResponse {
    let batch = decode_payload(&payload);
    let reports = batch.len();

    match state.submit_batch(batch).await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(json!(IngestResponse {
                accepted: true,
                reports
            })),
        ),
        Err(e) => {
            tracing::error!("Rejecting batch: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": "Tracking engine unavailable",
                    "hint": "The server is shutting down"
                })),
            )
        }
    }
}

async fn get_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.snapshot().stats_report())
}

async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot();
    Json(StatusResponse {
        feed: state.feed_status(),
        feed_configured: state.config().feed_url.is_some(),
        batches_processed: snapshot.batches_processed,
        tracked: snapshot.drones.len(),
    })
}
