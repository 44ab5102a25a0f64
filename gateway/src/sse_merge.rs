//! Merges the reasoning pipeline's synthetic SSE events with the upstream
//! model's own event stream into the single byte stream the client sees.
//!
//! Ordering is the invariant that matters here: every synthetic event is
//! emitted and flushed before the first upstream delta, and the stream
//! ends with exactly one `data: [DONE]\n\n` regardless of which side
//! produced the last real event.

use bytes::Bytes;
use futures::Stream;
use gw_protocol::{chat::ChatCompletionRequest, sse::SseEvent};
use pipeline::PipelineRunner;
use tokio::sync::{mpsc, oneshot};
use toolfleet::catalog::ToolEntry;
use tracing::warn;

use crate::error::GatewayError;
use crate::state::UpstreamClient;
use crate::upstream;

/// Run the pipeline, stream its synthetic events, then proxy the upstream
/// model's stream, and finally emit the terminal `[DONE]`.
pub fn merge_response_stream(
    pipeline: PipelineRunner,
    request: ChatCompletionRequest,
    available_tools: Vec<ToolEntry>,
    upstream: UpstreamClient,
    id: String,
    model: String,
    created: u64,
) -> impl Stream<Item = Bytes> {
    async_stream::stream! {
        let (tx, mut rx) = mpsc::unbounded_channel::<SseEvent>();
        let (augmented_tx, augmented_rx) = oneshot::channel::<ChatCompletionRequest>();

        let pipeline_id = id.clone();
        let pipeline_model = model.clone();
        let pipeline_handle = tokio::spawn(async move {
            let augmented = pipeline
                .run(request, available_tools, &pipeline_id, &pipeline_model, created, &tx)
                .await;
            let _ = augmented_tx.send(augmented);
        });

        while let Some(event) = rx.recv().await {
            yield Bytes::from(event.to_string());
        }

        let augmented = match augmented_rx.await {
            Ok(request) => request,
            Err(_) => {
                warn!("pipeline task ended without returning a request");
                yield Bytes::from(SseEvent::Done.to_string());
                return;
            }
        };
        let _ = pipeline_handle.await;

        match upstream::stream_chat_completion(&upstream, &augmented).await {
            Ok(mut events) => {
                use futures::StreamExt;
                while let Some(event) = events.next().await {
                    match event {
                        Ok(event) => yield Bytes::from(event.to_string()),
                        Err(e) => {
                            warn!(error = %e, "upstream stream failed mid-response");
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to reach upstream model");
                let chunk = gw_protocol::chat::ChatCompletionChunk::content_delta(
                    &id,
                    &model,
                    created,
                    format!("⚠️ upstream error: {e}"),
                );
                if let Ok(event) = SseEvent::from_json(&chunk) {
                    yield Bytes::from(event.to_string());
                }
            }
        }

        yield Bytes::from(SseEvent::Done.to_string());
    }
}
