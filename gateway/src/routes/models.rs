//! `GET /v1/models` — an OpenAI-shaped listing of the single configured
//! upstream model; this gateway proxies one model, it doesn't aggregate a
//! fleet of them.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct ModelObject {
    id: String,
    object: &'static str,
    owned_by: &'static str,
}

#[derive(Serialize)]
pub struct ModelList {
    object: &'static str,
    data: Vec<ModelObject>,
}

pub async fn models(State(state): State<Arc<AppState>>) -> Json<ModelList> {
    Json(ModelList {
        object: "list",
        data: vec![ModelObject {
            id: state.upstream.model.clone(),
            object: "model",
            owned_by: "gateway",
        }],
    })
}
