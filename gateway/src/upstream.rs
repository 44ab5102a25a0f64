//! Forwards an (already pipeline-augmented) request to the upstream model
//! and exposes its SSE stream as a sequence of [`SseEvent`]s, buffering
//! partial frames the way a proxy must when upstream writes don't align
//! with `\n\n` boundaries.

use futures::{Stream, StreamExt};
use gw_protocol::{
    chat::ChatCompletionRequest,
    sse::{parse_data_line, split_frames, SseEvent},
};

use crate::error::GatewayError;
use crate::state::UpstreamClient;

/// POST the request to the upstream model and return its body as a stream
/// of decoded `SseEvent`s. The upstream's own `[DONE]` sentinel is consumed
/// here, not forwarded — the caller appends its own exactly once.
pub async fn stream_chat_completion(
    client: &UpstreamClient,
    request: &ChatCompletionRequest,
) -> Result<impl Stream<Item = Result<SseEvent, GatewayError>>, GatewayError> {
    let mut builder = client.http.post(client.chat_completions_url()).json(request);
    if let Some(key) = &client.api_key {
        builder = builder.bearer_auth(key);
    }

    let response = builder
        .send()
        .await
        .map_err(|e| GatewayError::UpstreamFailure(e.to_string()))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(GatewayError::UpstreamFailure(format!(
            "upstream returned {status}: {body}"
        )));
    }

    Ok(decode_event_stream(response))
}

fn decode_event_stream(
    response: reqwest::Response,
) -> impl Stream<Item = Result<SseEvent, GatewayError>> {
    async_stream::stream! {
        let mut buf = String::new();
        let mut bytes = response.bytes_stream();

        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    yield Err(GatewayError::UpstreamFailure(e.to_string()));
                    return;
                }
            };
            buf.push_str(&String::from_utf8_lossy(&chunk));

            for event in drain_frames(&mut buf) {
                yield Ok(event);
            }
        }

        for event in drain_frames(&mut buf) {
            yield Ok(event);
        }
    }
}

/// Pull every complete `\n\n`-terminated frame out of `buf`, leaving any
/// trailing partial frame in place for the next read.
fn drain_frames(buf: &mut String) -> Vec<SseEvent> {
    let (frames, rest_len) = {
        let (frames, rest) = split_frames(buf);
        let owned: Vec<String> = frames
            .iter()
            .filter_map(|frame| parse_data_line(frame))
            .map(|payload| payload.to_string())
            .collect();
        (owned, rest.len())
    };
    let consumed = buf.len() - rest_len;
    buf.drain(..consumed);
    frames.into_iter().map(SseEvent::Data).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_frames_leaves_partial_trailing_bytes_in_buffer() {
        let mut buf = "data: {\"a\":1}\n\ndata: {\"a\":2".to_string();
        let events = drain_frames(&mut buf);
        assert_eq!(events.len(), 1);
        assert_eq!(buf, "data: {\"a\":2");
    }

    #[test]
    fn drain_frames_skips_the_done_sentinel() {
        let mut buf = "data: {\"a\":1}\n\ndata: [DONE]\n\n".to_string();
        let events = drain_frames(&mut buf);
        assert_eq!(events.len(), 1);
        assert!(buf.is_empty());
    }
}
