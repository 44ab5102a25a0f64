//! Request augmentation: folds collected tool results into a
//! single leading system message, and strips the pipeline's own scaffolding
//! from prior turns before the request goes upstream.

use gw_protocol::chat::ChatCompletionRequest;

use crate::context::CollectedResult;

/// The three literal markers in the reasoning-scaffold filter set, kept
/// deliberately small and overt.
const REASONING_MARKERS: &[&str] = &[
    "🧠 **Reasoning**",
    "**Response Analysis:**",
    "\u{200B}SYS-REASONING\u{200B}",
];

/// Strip any message content that was produced by this pipeline's own
/// reasoning/analysis scaffolding on a prior turn, so the model never
/// re-ingests its own pre-answer commentary on multi-turn calls.
pub fn strip_reasoning_markers(request: &mut ChatCompletionRequest) {
    request.messages.retain(|m| {
        !REASONING_MARKERS
            .iter()
            .any(|marker| m.content.contains(marker))
    });
}

/// Build the unified system-message block: every collected tool result,
/// each labeled with its owning tool.
fn context_block(collected: &[CollectedResult]) -> String {
    let mut lines = vec!["Tool context collected for this request:".to_string()];
    for result in collected.iter().filter(|r| r.success) {
        let rendered = result.rendered_text().unwrap_or_default();
        lines.push(format!("[{}] {}", result.tool_name, rendered));
    }
    lines.join("\n")
}

/// Fold `collected` into `request`: concatenate any
/// pre-existing `system` messages with the new context block into a single
/// `system` message at index 0. A no-op (returns the request unchanged) when
/// there is nothing successful to fold in.
pub fn augment_request(mut request: ChatCompletionRequest, collected: &[CollectedResult]) -> ChatCompletionRequest {
    if !collected.iter().any(|r| r.success) {
        return request;
    }

    strip_reasoning_markers(&mut request);

    let existing_system: Vec<String> = request
        .messages
        .iter()
        .filter(|m| m.role == gw_protocol::chat::Role::System)
        .map(|m| m.content.clone())
        .collect();

    let mut parts = existing_system;
    parts.push(context_block(collected));
    let unified = parts.join("\n\n");

    request.with_unified_system_message(unified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_protocol::chat::{ChatMessage, Role};
    use serde_json::{Map, Value};

    fn base_request() -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: "gpt-test".into(),
            messages: vec![ChatMessage {
                role: Role::User,
                content: "Show me my assigned tickets".into(),
                name: None,
            }],
            temperature: None,
            top_p: None,
            max_tokens: None,
            stream: true,
            stream_options: None,
            frequency_penalty: None,
            presence_penalty: None,
            other: Map::new(),
        }
    }

    fn tool_result(tool_name: &str, success: bool, result: Option<&str>) -> CollectedResult {
        CollectedResult {
            success,
            tool_name: tool_name.to_string(),
            server_name: Some("tracker".into()),
            result: result.map(|s| Value::String(s.to_string())),
            error_message: None,
            execution_time_ms: 10,
        }
    }

    #[test]
    fn empty_collected_context_leaves_request_unchanged() {
        let request = base_request();
        let original_len = request.messages.len();
        let augmented = augment_request(request, &[]);
        assert_eq!(augmented.messages.len(), original_len);
        assert!(!augmented.messages.iter().any(|m| m.role == Role::System));
    }

    #[test]
    fn successful_result_produces_single_leading_system_message() {
        let request = base_request();
        let collected = vec![tool_result("find_assigned_tickets", true, Some("TICKET-1, TICKET-2"))];
        let augmented = augment_request(request, &collected);

        assert_eq!(augmented.messages[0].role, Role::System);
        assert!(augmented.messages[0].content.contains("find_assigned_tickets"));
        assert!(augmented.messages[0].content.contains("TICKET-1, TICKET-2"));
        assert_eq!(
            augmented.messages.iter().filter(|m| m.role == Role::System).count(),
            1
        );
    }

    #[test]
    fn failed_results_are_excluded_from_the_context_block() {
        let request = base_request();
        let collected = vec![
            tool_result("find_assigned_tickets", true, Some("TICKET-1")),
            tool_result("slow_tool", false, None),
        ];
        let augmented = augment_request(request, &collected);
        assert!(!augmented.messages[0].content.contains("slow_tool"));
    }

    #[test]
    fn marker_filter_strips_prior_reasoning_scaffolding() {
        let mut request = base_request();
        request.messages.push(ChatMessage {
            role: Role::Assistant,
            content: "🧠 **Reasoning** I considered three tools...".into(),
            name: None,
        });
        strip_reasoning_markers(&mut request);
        assert_eq!(request.messages.len(), 1);
    }
}
