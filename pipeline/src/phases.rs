//! The four-phase state machine bodies. Each phase is
//! polymorphic over its `AgentBackend`: an LLM-backed call that falls back
//! to the deterministic rule-based implementation on any failure.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use toolfleet::invoker::{ExecuteOptions, ToolInvoker};

use crate::agents::{with_fallback, AgentBackend};
use crate::context::{CollectedResult, Phase, ReasoningContext};
use crate::intent::{rule_based_intent, IntentAnalysis};
use crate::plan::{rule_based_plan, ExecutionPlan, PlanStep, StepType};
use crate::sufficiency::{rule_based_sufficiency, SufficiencyEvaluation};

const INTENT_SYSTEM_PROMPT: &str = "You classify a user's request into one of: \
task_management, version_control, file_management, data_analysis, general_query, conversation. \
Respond with a single JSON object matching the IntentAnalysis schema and nothing else.";

const PLAN_SYSTEM_PROMPT: &str = "You produce a step-by-step execution plan for the given intent \
and the tools currently available. Respond with a single JSON object matching the ExecutionPlan \
schema and nothing else.";

const CONTINUE_SYSTEM_PROMPT: &str = "Given the plan and the results collected so far, decide \
whether execution should continue. Respond with a single JSON object: {\"should_continue\": bool}.";

const SUFFICIENCY_SYSTEM_PROMPT: &str = "Given the original request, the intent, the plan, and \
the collected tool results, decide whether there is enough context to answer. Respond with a \
single JSON object matching the SufficiencyEvaluation schema and nothing else.";

/// Phase 1: intent analysis.
pub async fn analyze_intent(ctx: &mut ReasoningContext, backend: &AgentBackend) {
    let message = ctx.original_message.clone();
    let tool_names: Vec<String> = ctx.available_tools.iter().map(|t| t.name.clone()).collect();

    let intent = with_fallback(
        backend,
        "intent_analysis",
        {
            let message = message.clone();
            let tool_names = tool_names.clone();
            move |agent| async move {
                let user_prompt = format!(
                    "Message: {message}\nAvailable tools: {}",
                    tool_names.join(", ")
                );
                agent
                    .structured_call::<IntentAnalysis>(INTENT_SYSTEM_PROMPT, &user_prompt)
                    .await
            }
        },
        || rule_based_intent(&message),
    )
    .await;

    ctx.record(
        Phase::IntentAnalysis,
        format!("classified as {} (confidence {:.2})", intent.intent_type.as_str(), intent.confidence),
    );
    ctx.intent_analysis = Some(intent);
    ctx.phase = Phase::PlanGeneration;
}

/// Phase 2: plan generation.
pub async fn generate_plan(ctx: &mut ReasoningContext, backend: &AgentBackend) {
    let intent = ctx
        .intent_analysis
        .clone()
        .expect("generate_plan called before analyze_intent");
    let available_tools = ctx.available_tools.clone();

    let plan = with_fallback(
        backend,
        "plan_generation",
        {
            let intent = intent.clone();
            let available_tools = available_tools.clone();
            move |agent| async move {
                let user_prompt = format!(
                    "Intent: {}\nAvailable tools: {}",
                    intent.primary_goal,
                    available_tools.iter().map(|t| t.name.as_str()).collect::<Vec<_>>().join(", ")
                );
                agent.structured_call::<ExecutionPlan>(PLAN_SYSTEM_PROMPT, &user_prompt).await
            }
        },
        move || rule_based_plan(&intent, &available_tools),
    )
    .await;

    ctx.record(Phase::PlanGeneration, format!("{} step(s) planned", plan.steps.len()));
    ctx.execution_plan = Some(plan);
    ctx.phase = Phase::PlanExecution;
}

#[derive(Deserialize)]
struct ContinueDecision {
    should_continue: bool,
}

/// Consult the agent after a step: should execution continue? Parse
/// failure defaults to continuing.
async fn should_continue(ctx: &ReasoningContext, backend: &AgentBackend) -> bool {
    let plan = ctx.execution_plan.as_ref().expect("plan must exist during execution");
    match backend {
        AgentBackend::RuleBased => true,
        AgentBackend::LlmBacked(agent) => {
            let user_prompt = format!(
                "Plan has {} steps; {} results collected so far.",
                plan.steps.len(),
                ctx.collected_context.len()
            );
            agent
                .structured_call::<ContinueDecision>(CONTINUE_SYSTEM_PROMPT, &user_prompt)
                .await
                .map(|d| d.should_continue)
                .unwrap_or(true)
        }
    }
}

/// Per-call callback invoked for every tool-call step as it resolves, used
/// by the gateway to emit `execution-result` events in real time.
pub type StepObserver<'a> = &'a (dyn Fn(&PlanStep, &CollectedResult) + Send + Sync);

/// Phase 3: iterate the plan's steps in `step_number` order.
pub async fn execute_plan(
    ctx: &mut ReasoningContext,
    backend: &AgentBackend,
    invoker: &Arc<ToolInvoker>,
    tool_timeout: Duration,
    on_step: Option<StepObserver<'_>>,
) {
    let plan = ctx
        .execution_plan
        .clone()
        .expect("execute_plan called before generate_plan");
    let mut executed_steps = Vec::new();

    for step in &plan.steps {
        if !plan.is_step_ready(step, &executed_steps) {
            continue;
        }

        match step.step_type {
            StepType::ToolCall => {
                let tool_name = resolve_tool_name(step, &ctx.available_tools);
                let result = match tool_name {
                    Some(tool_name) => {
                        let outcome = invoker
                            .execute_tool(
                                &tool_name,
                                serde_json::Map::new(),
                                ExecuteOptions {
                                    timeout: Some(tool_timeout),
                                    use_cache: true,
                                    ..Default::default()
                                },
                            )
                            .await;
                        CollectedResult {
                            success: outcome.success,
                            tool_name: outcome.tool_name,
                            server_name: outcome.server_name,
                            result: outcome.result,
                            error_message: outcome.error_message,
                            execution_time_ms: outcome.execution_time_ms,
                        }
                    }
                    None => CollectedResult {
                        success: false,
                        tool_name: step.required_tools.join(","),
                        server_name: None,
                        result: None,
                        error_message: Some("no_server".to_string()),
                        execution_time_ms: 0,
                    },
                };
                if let Some(observer) = on_step {
                    observer(step, &result);
                }
                ctx.collected_context.push(result);
            }
            StepType::Analysis => {
                // An LLM invocation whose response is recorded but not used
                // as structured output.
                if let AgentBackend::LlmBacked(agent) = backend {
                    let _ = agent
                        .structured_call::<serde_json::Value>(
                            "Analyze the collected context so far.",
                            &step.expected_output,
                        )
                        .await;
                }
                ctx.record(Phase::PlanExecution, format!("analysis step '{}' recorded", step.step_name));
            }
            StepType::Processing => {
                // Synchronous aggregation over `collected_context`, no I/O.
                let successes = ctx.successful_tool_count();
                ctx.record(
                    Phase::PlanExecution,
                    format!("processing step '{}' aggregated {successes} successful result(s)", step.step_name),
                );
            }
        }

        executed_steps.push(step.step_number);

        if !should_continue(ctx, backend).await {
            ctx.record(Phase::PlanExecution, "agent recommended halting plan execution early".to_string());
            break;
        }
    }

    ctx.phase = Phase::ContextEvaluation;
}

fn resolve_tool_name(step: &PlanStep, available_tools: &[toolfleet::catalog::ToolEntry]) -> Option<String> {
    for hint in &step.required_tools {
        if available_tools.iter().any(|t| t.name == *hint) {
            return Some(hint.clone());
        }
        if let Some(matched) = available_tools.iter().find(|t| t.name.contains(hint.as_str())) {
            return Some(matched.name.clone());
        }
    }
    None
}

/// Phase 4: context sufficiency.
pub async fn evaluate_sufficiency(ctx: &mut ReasoningContext, backend: &AgentBackend) -> SufficiencyEvaluation {
    let evaluation = with_fallback(
        backend,
        "context_evaluation",
        {
            let collected_len = ctx.collected_context.len();
            let message = ctx.original_message.clone();
            move |agent| async move {
                let user_prompt = format!(
                    "Original request: {message}\nCollected {collected_len} tool result(s)."
                );
                agent
                    .structured_call::<SufficiencyEvaluation>(SUFFICIENCY_SYSTEM_PROMPT, &user_prompt)
                    .await
            }
        },
        || rule_based_sufficiency(ctx),
    )
    .await;

    ctx.record(
        Phase::ContextEvaluation,
        format!(
            "sufficiency={:.2} recommendation={:?}",
            evaluation.sufficiency_score, evaluation.recommendation
        ),
    );
    ctx.phase = Phase::Completion;
    evaluation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sufficiency::Recommendation;
    use std::sync::Arc;
    use toolfleet::{catalog::Catalog, registry::ServerRegistry};

    fn empty_invoker() -> Arc<ToolInvoker> {
        Arc::new(ToolInvoker::new(
            Arc::new(ServerRegistry::new()),
            Arc::new(Catalog::new()),
            toolfleet::invoker::ExecutionStrategy::FirstAvailable,
        ))
    }

    #[tokio::test]
    async fn full_phase_sequence_with_no_tools_stops_and_responds() {
        let mut ctx = ReasoningContext::new("What's the weather in Paris?", vec![]);
        let backend = AgentBackend::RuleBased;

        analyze_intent(&mut ctx, &backend).await;
        generate_plan(&mut ctx, &backend).await;
        let invoker = empty_invoker();
        execute_plan(&mut ctx, &backend, &invoker, Duration::from_secs(1), None).await;
        let evaluation = evaluate_sufficiency(&mut ctx, &backend).await;

        assert!(ctx.collected_context.is_empty());
        assert_eq!(evaluation.recommendation, Recommendation::StopAndRespond);
        assert_eq!(ctx.phase, Phase::Completion);
    }

    #[tokio::test]
    async fn tool_call_with_no_server_records_no_server_error() {
        let mut ctx = ReasoningContext::new(
            "Show me my assigned tickets",
            vec![toolfleet::catalog::ToolEntry::new(
                "find_assigned_tickets",
                "tracker",
                None,
                serde_json::Map::new(),
            )],
        );
        let backend = AgentBackend::RuleBased;
        analyze_intent(&mut ctx, &backend).await;
        generate_plan(&mut ctx, &backend).await;
        let invoker = empty_invoker();
        execute_plan(&mut ctx, &backend, &invoker, Duration::from_secs(1), None).await;

        assert_eq!(ctx.collected_context.len(), 1);
        assert!(!ctx.collected_context[0].success);
        assert_eq!(ctx.collected_context[0].error_message.as_deref(), Some("no_server"));
    }
}
