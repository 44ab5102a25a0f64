//! Pipeline configuration: the gateway's `pipeline` config section.

use std::time::Duration;

use crate::agents::ReasoningModelConfig;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub reasoning_model: Option<ReasoningModelConfig>,
    /// Escape hatch: skip the LLM-backed agents entirely and always use the
    /// deterministic rule-based ones.
    pub rule_based_only: bool,
    /// Bound on re-entering `PlanGeneration` after a `continue_collection`
    /// recommendation from phase 4. Default 0 never loops; raise it to opt
    /// into the bounded re-entry described in the design notes.
    pub max_plan_execution_loops: u32,
    pub default_tool_timeout: Duration,
    pub max_concurrent_tool_calls: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            reasoning_model: None,
            rule_based_only: true,
            max_plan_execution_loops: 0,
            default_tool_timeout: Duration::from_secs(30),
            max_concurrent_tool_calls: 8,
        }
    }
}
