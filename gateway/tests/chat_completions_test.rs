//! End-to-end coverage of `POST /v1/chat/completions`: boots a real
//! `AppState` against no configured tool servers and a wiremock stand-in
//! for the upstream model, then asserts on the byte-level shape of the
//! merged SSE stream the client actually receives.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use gateway::config::GatewayConfig;
use gateway::state::AppState;
use http_body_util::BodyExt;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(upstream_base_url: &str) -> GatewayConfig {
    let yaml = format!(
        r#"
upstream:
  base_url: "{upstream_base_url}"
  model: "gpt-test"
pipeline:
  rule_based_only: true
"#
    );
    serde_yaml::from_str(&yaml).expect("yaml parses")
}

async fn build_app(upstream: &MockServer) -> axum::Router {
    let config = config_for(&upstream.uri());
    let state = AppState::bootstrap(&config).await.expect("bootstrap");
    gateway::routes::build_router(Arc::new(state))
}

async fn post_chat_completions(app: axum::Router, body: serde_json::Value) -> (StatusCode, String) {
    let request = Request::builder()
        .method("POST")
        .uri("/v1/chat/completions")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.expect("request succeeds");
    let status = response.status();
    let bytes = response.into_body().collect().await.expect("body collects").to_bytes();
    (status, String::from_utf8(bytes.to_vec()).expect("utf8 body"))
}

/// Scenario 1 (no matching tool, §8): with zero tool servers registered the
/// intent classifier still runs, the plan has no tool-call steps, and the
/// client sees all five reasoning events before the upstream's own delta
/// and a single terminal `[DONE]`.
#[tokio::test]
async fn streams_reasoning_events_then_upstream_delta_then_done() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(
                    "data: {\"id\":\"up1\",\"choices\":[{\"delta\":{\"content\":\"Paris is sunny.\"}}]}\n\ndata: [DONE]\n\n",
                ),
        )
        .mount(&upstream)
        .await;

    let app = build_app(&upstream).await;
    let body = serde_json::json!({
        "model": "gpt-test",
        "stream": true,
        "messages": [{"role": "user", "content": "What's the weather in Paris?"}],
    });

    let (status, text) = post_chat_completions(app, body).await;
    assert_eq!(status, StatusCode::OK);

    let reasoning_start = text.find("Analyzing...").expect("reasoning-start event present");
    let reasoning_end = text.find("Analysis complete.").expect("reasoning-end event present");
    let upstream_delta = text.find("Paris is sunny.").expect("upstream delta relayed");
    let done = text.rfind("data: [DONE]").expect("stream terminates with [DONE]");

    assert!(reasoning_start < reasoning_end, "reasoning-start must precede reasoning-end");
    assert!(reasoning_end < upstream_delta, "all reasoning events precede the first upstream delta");
    assert!(upstream_delta < done, "upstream delta precedes the terminal [DONE]");
    assert_eq!(text.matches("data: [DONE]").count(), 1, "exactly one [DONE] line");
}

/// A non-streaming request is rejected before it ever reaches the pipeline
/// or the upstream model.
#[tokio::test]
async fn non_streaming_request_is_rejected() {
    let upstream = MockServer::start().await;
    let app = build_app(&upstream).await;
    let body = serde_json::json!({
        "model": "gpt-test",
        "stream": false,
        "messages": [{"role": "user", "content": "hello"}],
    });

    let (status, text) = post_chat_completions(app, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(text.contains("protocol_error"));
}

/// §8 boundary behavior: a pipeline with zero healthy servers still runs to
/// completion and forwards the request, rather than failing the whole call.
#[tokio::test]
async fn upstream_failure_surfaces_as_an_error_delta_and_still_terminates() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&upstream)
        .await;

    let app = build_app(&upstream).await;
    let body = serde_json::json!({
        "model": "gpt-test",
        "stream": true,
        "messages": [{"role": "user", "content": "Show me my assigned tickets"}],
    });

    let (status, text) = post_chat_completions(app, body).await;
    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("upstream error"));
    assert_eq!(text.matches("data: [DONE]").count(), 1);
}
