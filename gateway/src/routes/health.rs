//! `GET /health`.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    servers_connected: usize,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let stats = state.registry().get_registry_stats().await;
    Json(HealthResponse {
        status: "ok",
        servers_connected: stats.connected,
    })
}
