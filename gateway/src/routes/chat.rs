//! `POST /v1/chat/completions` — the gateway's single client-facing
//! endpoint. Streaming-only: a request without `"stream": true` is
//! rejected before it ever reaches the pipeline.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use futures::StreamExt;
use gw_protocol::chat::ChatCompletionRequest;
use uuid::Uuid;

use crate::error::GatewayError;
use crate::sse_merge::merge_response_stream;
use crate::state::AppState;

pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatCompletionRequest>,
) -> Result<Response, GatewayError> {
    if !request.stream {
        return Err(GatewayError::BadRequest(
            "this gateway only serves streaming chat completions; set \"stream\": true".to_string(),
        ));
    }

    let id = format!("chatcmpl-{}", Uuid::new_v4());
    let created = Utc::now().timestamp().max(0) as u64;
    let model = request.model.clone();
    let available_tools = state.catalog().all_tools();

    let stream = merge_response_stream(
        state.pipeline.clone(),
        request,
        available_tools,
        state.upstream.clone(),
        id,
        model,
        created,
    )
    .map(Ok::<_, std::convert::Infallible>);

    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    Ok(response)
}
