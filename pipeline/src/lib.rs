//! Four-phase reasoning pipeline: classifies intent, plans tool use,
//! executes the plan against a tool fleet, and judges whether the
//! collected context is sufficient to answer — folding whatever it
//! collects into the request before the gateway forwards it upstream.

pub mod agents;
pub mod augmentation;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod intent;
pub mod phases;
pub mod plan;
pub mod runner;
pub mod sufficiency;

pub use agents::{AgentBackend, LlmAgent, ReasoningModelConfig};
pub use config::PipelineConfig;
pub use context::{CollectedResult, Phase, ReasoningContext, ReasoningLogEntry};
pub use error::{PipelineError, PipelineResult};
pub use intent::{ComplexityLevel, IntentAnalysis, IntentType};
pub use plan::{ExecutionPlan, PlanStep, StepType};
pub use runner::PipelineRunner;
pub use sufficiency::{Recommendation, SufficiencyEvaluation};
