//! Streaming emission: synthetic pre-answer SSE events, byte-
//! compatible with the upstream model's own event envelope.

use gw_protocol::{chat::ChatCompletionChunk, sse::SseEvent};

use crate::context::Phase;

/// Build the `reasoning-start` event: the first thing the client sees.
pub fn reasoning_start(id: &str, model: &str, created: u64) -> SseEvent {
    content_event(id, model, created, "🔍 Analyzing...")
}

/// Build the `phase` event announcing a phase has begun.
pub fn phase_started(id: &str, model: &str, created: u64, phase: Phase) -> SseEvent {
    content_event(id, model, created, phase.progress_label())
}

/// Build a compact `phase-result` summary line.
pub fn phase_result(id: &str, model: &str, created: u64, summary: &str) -> SseEvent {
    content_event(id, model, created, summary)
}

/// Build an `execution-result` line for one tool call: "✅ tool: content" on
/// success, "❌ tool: error" on failure.
pub fn execution_result(id: &str, model: &str, created: u64, tool_name: &str, outcome: Result<&str, &str>) -> SseEvent {
    let line = match outcome {
        Ok(content) => format!("✅ {tool_name}: {content}"),
        Err(error) => format!("❌ {tool_name}: {error}"),
    };
    content_event(id, model, created, line)
}

/// Build the `reasoning-end` event that precedes the first upstream delta.
pub fn reasoning_end(id: &str, model: &str, created: u64) -> SseEvent {
    content_event(id, model, created, "✅ Analysis complete.")
}

/// Build the `error` event emitted on any pipeline failure; the request is
/// still forwarded un-augmented afterward.
pub fn pipeline_error(id: &str, model: &str, created: u64, message: &str) -> SseEvent {
    content_event(id, model, created, format!("⚠️ reasoning error: {message}"))
}

fn content_event(id: &str, model: &str, created: u64, content: impl Into<String>) -> SseEvent {
    let chunk = ChatCompletionChunk::content_delta(id, model, created, content);
    SseEvent::from_json(&chunk).expect("ChatCompletionChunk always serializes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasoning_start_contains_analyzing_marker() {
        let event = reasoning_start("id1", "gpt-test", 0);
        assert!(event.to_string().contains("Analyzing"));
        assert!(event.to_string().starts_with("data: "));
        assert!(event.to_string().ends_with("\n\n"));
    }

    #[test]
    fn execution_result_formats_success_and_failure() {
        let ok = execution_result("id1", "m", 0, "find_assigned_tickets", Ok("3 tickets"));
        assert!(ok.to_string().contains("✅ find_assigned_tickets: 3 tickets"));

        let err = execution_result("id1", "m", 0, "find_assigned_tickets", Err("timeout"));
        assert!(err.to_string().contains("❌ find_assigned_tickets: timeout"));
    }
}
