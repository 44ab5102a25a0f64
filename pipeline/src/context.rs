//! Per-request reasoning context: constructed at pipeline entry,
//! consumed and discarded at pipeline exit. Never outlives the HTTP response.

use serde::{Deserialize, Serialize};

use crate::intent::IntentAnalysis;
use crate::plan::ExecutionPlan;
use toolfleet::catalog::ToolEntry;

/// Which of the four phases (or the terminal state) the pipeline currently
/// occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    IntentAnalysis,
    PlanGeneration,
    PlanExecution,
    ContextEvaluation,
    Completion,
}

impl Phase {
    /// The synthetic progress line emitted when this phase starts.
    pub fn progress_label(&self) -> &'static str {
        match self {
            Phase::IntentAnalysis => "Analyzing user intent...",
            Phase::PlanGeneration => "Creating detailed execution plan...",
            Phase::PlanExecution => "Executing plan...",
            Phase::ContextEvaluation => "Evaluating context...",
            Phase::Completion => "Analysis complete.",
        }
    }
}

/// One successful (or failed) tool invocation folded into the request,
/// normalized to a fixed shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectedResult {
    pub success: bool,
    pub tool_name: String,
    pub server_name: Option<String>,
    pub result: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub execution_time_ms: u64,
}

impl CollectedResult {
    /// Renders `result` as the text an operator or the model should see,
    /// extracting `content[].text` from an MCP `CallToolResult` shape
    /// (`{"content":[{"type":"text","text":"..."}]}`) rather than treating
    /// the whole JSON object as opaque.
    pub fn rendered_text(&self) -> Option<String> {
        self.result.as_ref().map(render_json_value)
    }
}

fn render_json_value(value: &serde_json::Value) -> String {
    if let Some(content) = value.get("content").and_then(|c| c.as_array()) {
        let texts: Vec<&str> = content
            .iter()
            .filter_map(|block| block.get("text").and_then(|t| t.as_str()))
            .collect();
        if !texts.is_empty() {
            return texts.join("\n");
        }
    }
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}

/// An entry in the ordered log of phase outputs, recorded for observability
/// and for the completeness of `collected_context`'s audit trail.
#[derive(Debug, Clone, Serialize)]
pub struct ReasoningLogEntry {
    pub phase: Phase,
    pub summary: String,
}

/// The value threaded through the pipeline for a single request.
pub struct ReasoningContext {
    pub original_message: String,
    /// Snapshot of the catalog's tools taken at pipeline entry: agents
    /// reason over a fixed view, not one that can shift mid-request as
    /// discovery re-merges run concurrently.
    pub available_tools: Vec<ToolEntry>,
    pub reasoning_history: Vec<ReasoningLogEntry>,
    pub phase: Phase,
    pub collected_context: Vec<CollectedResult>,
    pub intent_analysis: Option<IntentAnalysis>,
    pub execution_plan: Option<ExecutionPlan>,
    /// Number of times the pipeline has re-entered `PlanGeneration` after a
    /// `continue_collection` recommendation from phase 4.
    pub plan_execution_loops: u32,
}

impl ReasoningContext {
    pub fn new(original_message: impl Into<String>, available_tools: Vec<ToolEntry>) -> Self {
        Self {
            original_message: original_message.into(),
            available_tools,
            reasoning_history: Vec::new(),
            phase: Phase::IntentAnalysis,
            collected_context: Vec::new(),
            intent_analysis: None,
            execution_plan: None,
            plan_execution_loops: 0,
        }
    }

    pub fn record(&mut self, phase: Phase, summary: impl Into<String>) {
        self.reasoning_history.push(ReasoningLogEntry {
            phase,
            summary: summary.into(),
        });
    }

    pub fn successful_tool_count(&self) -> usize {
        self.collected_context.iter().filter(|r| r.success).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with(value: serde_json::Value) -> CollectedResult {
        CollectedResult {
            success: true,
            tool_name: "search_tickets".to_string(),
            server_name: Some("jira".to_string()),
            result: Some(value),
            error_message: None,
            execution_time_ms: 12,
        }
    }

    #[test]
    fn rendered_text_extracts_content_blocks() {
        let result = result_with(serde_json::json!({
            "content": [
                {"type": "text", "text": "first"},
                {"type": "text", "text": "second"},
            ]
        }));
        assert_eq!(result.rendered_text().as_deref(), Some("first\nsecond"));
    }

    #[test]
    fn rendered_text_falls_back_to_plain_string() {
        let result = result_with(serde_json::json!("plain result"));
        assert_eq!(result.rendered_text().as_deref(), Some("plain result"));
    }

    #[test]
    fn rendered_text_falls_back_to_json_dump_for_unknown_shapes() {
        let result = result_with(serde_json::json!({"ticket_id": "JIRA-1"}));
        assert_eq!(result.rendered_text().as_deref(), Some("{\"ticket_id\":\"JIRA-1\"}"));
    }
}
