//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use super::bookings::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Step types the forward pipeline runs, in order.
    pub steps: Vec<String>,
}

/// GET /health — reports liveness and the configured pipeline.
pub async fn check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        steps: state.orchestrator.config().steps.clone(),
    })
}
