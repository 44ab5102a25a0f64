//! Phase 2 — plan generation: the ordered list of steps the
//! execution phase will carry out.

use serde::{Deserialize, Serialize};

use crate::intent::{IntentAnalysis, IntentType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    ToolCall,
    Analysis,
    Processing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    pub step_number: u32,
    pub step_name: String,
    pub step_type: StepType,
    pub required_tools: Vec<String>,
    /// Step numbers that must execute before this one. The pipeline only
    /// ever produces sequential plans, which makes this trivially satisfied,
    /// but the field is carried so a future planner can express branching.
    pub dependencies: Vec<u32>,
    pub expected_output: String,
    pub error_handling: String,
    pub estimated_time_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub plan_type: String,
    pub steps: Vec<PlanStep>,
    pub success_criteria: Vec<String>,
    pub fallback_strategies: Vec<String>,
    pub confidence: f32,
}

impl ExecutionPlan {
    /// A step is eligible only once every predecessor by `step_number` has
    /// already executed. The pipeline's rule-based and LLM-backed planners
    /// both only ever emit strictly increasing, fully chained dependencies,
    /// so this is never violated in practice — checked defensively anyway.
    pub fn is_step_ready(&self, step: &PlanStep, executed: &[u32]) -> bool {
        step.dependencies.iter().all(|dep| executed.contains(dep))
    }

    pub fn tool_call_steps(&self) -> impl Iterator<Item = &PlanStep> {
        self.steps.iter().filter(|s| s.step_type == StepType::ToolCall)
    }
}

/// Deterministic fallback per `intent_type`: used when the LLM-backed agent
/// fails to initialize, its output fails to parse, or it times out.
pub fn rule_based_plan(intent: &IntentAnalysis, available_tools: &[toolfleet::catalog::ToolEntry]) -> ExecutionPlan {
    match intent.intent_type {
        IntentType::TaskManagement => task_management_plan(intent, available_tools),
        IntentType::VersionControl => version_control_plan(intent, available_tools),
        IntentType::FileManagement => file_management_plan(intent, available_tools),
        IntentType::DataAnalysis => data_analysis_plan(intent, available_tools),
        IntentType::GeneralQuery | IntentType::Conversation => no_tool_plan(intent),
    }
}

fn find_tool<'a>(available_tools: &'a [toolfleet::catalog::ToolEntry], substrings: &[&str]) -> Option<&'a str> {
    available_tools
        .iter()
        .find(|t| substrings.iter().any(|s| t.name.to_lowercase().contains(s)))
        .map(|t| t.name.as_str())
}

/// Canonical example: authenticate, fetch-assigned-tickets,
/// format-results, with a strict dependency chain.
fn task_management_plan(intent: &IntentAnalysis, available_tools: &[toolfleet::catalog::ToolEntry]) -> ExecutionPlan {
    let fetch_tool = find_tool(available_tools, &["assigned", "ticket", "task"]);

    let mut steps = Vec::new();

    if let Some(tool_name) = fetch_tool {
        steps.push(PlanStep {
            step_number: 1,
            step_name: "authenticate".to_string(),
            step_type: StepType::Analysis,
            required_tools: vec![],
            dependencies: vec![],
            expected_output: "confirmation that the owning server session is usable".to_string(),
            error_handling: "proceed anyway; the tool call itself will surface an auth failure".to_string(),
            estimated_time_ms: 100,
        });

        steps.push(PlanStep {
            step_number: 2,
            step_name: "fetch_assigned_items".to_string(),
            step_type: StepType::ToolCall,
            required_tools: vec![tool_name.to_string()],
            dependencies: vec![1],
            expected_output: "list of assigned items".to_string(),
            error_handling: "continue with empty results and note the failure".to_string(),
            estimated_time_ms: 1500,
        });

        steps.push(PlanStep {
            step_number: 3,
            step_name: "format_results".to_string(),
            step_type: StepType::Processing,
            required_tools: vec![],
            dependencies: vec![2],
            expected_output: "formatted summary for the user".to_string(),
            error_handling: "fall back to raw tool output".to_string(),
            estimated_time_ms: 50,
        });
    }

    ExecutionPlan {
        plan_type: intent.intent_type.as_str().to_string(),
        steps,
        success_criteria: vec!["at least one tool call succeeded, or no tool was available".to_string()],
        fallback_strategies: vec!["respond without tool context if no server is healthy".to_string()],
        confidence: 0.7,
    }
}

fn version_control_plan(intent: &IntentAnalysis, available_tools: &[toolfleet::catalog::ToolEntry]) -> ExecutionPlan {
    single_best_effort_tool_plan(intent, available_tools, &["commit", "branch", "pull_request", "diff", "repo"])
}

fn file_management_plan(intent: &IntentAnalysis, available_tools: &[toolfleet::catalog::ToolEntry]) -> ExecutionPlan {
    single_best_effort_tool_plan(intent, available_tools, &["file", "read", "write", "list_dir"])
}

fn data_analysis_plan(intent: &IntentAnalysis, available_tools: &[toolfleet::catalog::ToolEntry]) -> ExecutionPlan {
    single_best_effort_tool_plan(intent, available_tools, &["query", "analyze", "report", "dataset"])
}

fn single_best_effort_tool_plan(
    intent: &IntentAnalysis,
    available_tools: &[toolfleet::catalog::ToolEntry],
    substrings: &[&str],
) -> ExecutionPlan {
    let steps = match find_tool(available_tools, substrings) {
        Some(tool_name) => vec![PlanStep {
            step_number: 1,
            step_name: format!("call_{tool_name}"),
            step_type: StepType::ToolCall,
            required_tools: vec![tool_name.to_string()],
            dependencies: vec![],
            expected_output: "tool result relevant to the request".to_string(),
            error_handling: "continue with empty results and note the failure".to_string(),
            estimated_time_ms: 1500,
        }],
        None => Vec::new(),
    };

    ExecutionPlan {
        plan_type: intent.intent_type.as_str().to_string(),
        steps,
        success_criteria: vec!["at least one tool call succeeded, or no tool was available".to_string()],
        fallback_strategies: vec!["respond without tool context if no server is healthy".to_string()],
        confidence: 0.6,
    }
}

/// `general_query` and `conversation` need no tool calls — the plan is empty
/// and the execution phase simply moves straight through.
fn no_tool_plan(intent: &IntentAnalysis) -> ExecutionPlan {
    ExecutionPlan {
        plan_type: intent.intent_type.as_str().to_string(),
        steps: vec![],
        success_criteria: vec!["the model can answer directly without tool context".to_string()],
        fallback_strategies: vec![],
        confidence: 0.8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::{rule_based_intent, ComplexityLevel};
    use toolfleet::catalog::ToolEntry;

    fn tool(name: &str) -> ToolEntry {
        ToolEntry::new(name, "tracker", None, serde_json::Map::new())
    }

    #[test]
    fn task_management_plan_has_three_chained_steps_when_tool_exists() {
        let intent = IntentAnalysis {
            intent_type: IntentType::TaskManagement,
            primary_goal: "find my tickets".into(),
            required_systems: vec![],
            specific_actions: vec![],
            information_needed: vec![],
            complexity_level: ComplexityLevel::Moderate,
            estimated_steps: 2,
            confidence: 0.7,
            reasoning: "test".into(),
        };
        let tools = vec![tool("find_assigned_tickets")];
        let plan = rule_based_plan(&intent, &tools);
        assert_eq!(plan.steps.len(), 3);
        assert_eq!(plan.steps[0].step_name, "authenticate");
        assert_eq!(plan.steps[1].step_type, StepType::ToolCall);
        assert_eq!(plan.steps[1].dependencies, vec![1]);
        assert_eq!(plan.steps[2].dependencies, vec![2]);
    }

    #[test]
    fn general_query_produces_zero_tool_call_steps() {
        let intent = rule_based_intent("What's the weather in Paris?");
        let plan = rule_based_plan(&intent, &[]);
        assert_eq!(plan.tool_call_steps().count(), 0);
    }

    #[test]
    fn no_matching_tool_yields_empty_plan() {
        let intent = rule_based_intent("Show me my assigned tickets");
        let plan = rule_based_plan(&intent, &[]);
        assert!(plan.steps.is_empty());
    }
}
