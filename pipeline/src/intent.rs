//! Phase 1 — intent analysis: classifies the user's latest message
//! into a closed set of intent types and estimates how much work answering
//! it will take.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    TaskManagement,
    VersionControl,
    FileManagement,
    DataAnalysis,
    GeneralQuery,
    Conversation,
}

impl IntentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentType::TaskManagement => "task_management",
            IntentType::VersionControl => "version_control",
            IntentType::FileManagement => "file_management",
            IntentType::DataAnalysis => "data_analysis",
            IntentType::GeneralQuery => "general_query",
            IntentType::Conversation => "conversation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    Simple,
    Moderate,
    Complex,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentAnalysis {
    pub intent_type: IntentType,
    pub primary_goal: String,
    pub required_systems: Vec<String>,
    pub specific_actions: Vec<String>,
    pub information_needed: Vec<String>,
    pub complexity_level: ComplexityLevel,
    pub estimated_steps: u32,
    pub confidence: f32,
    pub reasoning: String,
}

/// Keyword scoring table used by the rule-based fallback: each domain is
/// scored by how many of its keywords appear in the lowercased message, and
/// the highest-scoring domain wins ties broken by declaration order.
const DOMAIN_KEYWORDS: &[(IntentType, &[&str])] = &[
    (
        IntentType::TaskManagement,
        &["ticket", "task", "issue", "assigned", "todo", "backlog", "sprint"],
    ),
    (
        IntentType::VersionControl,
        &["commit", "branch", "pull request", "merge", "repo", "repository", "git", "diff"],
    ),
    (
        IntentType::FileManagement,
        &["file", "directory", "folder", "upload", "download", "path"],
    ),
    (
        IntentType::DataAnalysis,
        &["analyze", "chart", "report", "metric", "dataset", "query", "statistics"],
    ),
    (
        IntentType::Conversation,
        &["hello", "hi", "thanks", "thank you", "how are you", "bye"],
    ),
];

/// Deterministic fallback used on LLM-agent initialization failure, parse
/// failure, or timeout.
pub fn rule_based_intent(message: &str) -> IntentAnalysis {
    let lower = message.to_lowercase();

    let mut best: Option<(IntentType, usize)> = None;
    for (intent_type, keywords) in DOMAIN_KEYWORDS {
        let score = keywords.iter().filter(|kw| lower.contains(*kw)).count();
        if score > 0 && best.map(|(_, best_score)| score > best_score).unwrap_or(true) {
            best = Some((*intent_type, score));
        }
    }

    let (intent_type, matched_keywords) = match best {
        Some((intent_type, score)) => (intent_type, score),
        None => (IntentType::GeneralQuery, 0),
    };

    let complexity_level = if matched_keywords >= 3 {
        ComplexityLevel::Complex
    } else if matched_keywords >= 1 {
        ComplexityLevel::Moderate
    } else {
        ComplexityLevel::Simple
    };

    let estimated_steps = match complexity_level {
        ComplexityLevel::Simple => 1,
        ComplexityLevel::Moderate => 2,
        ComplexityLevel::Complex => 3,
    };

    IntentAnalysis {
        intent_type,
        primary_goal: message.to_string(),
        required_systems: Vec::new(),
        specific_actions: Vec::new(),
        information_needed: Vec::new(),
        complexity_level,
        estimated_steps,
        confidence: if matched_keywords > 0 { 0.6 } else { 0.3 },
        reasoning: format!(
            "rule-based keyword match scored {matched_keywords} hit(s) for {}",
            intent_type.as_str()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_keyword_classifies_as_task_management() {
        let analysis = rule_based_intent("Show me my assigned tickets");
        assert_eq!(analysis.intent_type, IntentType::TaskManagement);
    }

    #[test]
    fn no_keyword_hit_falls_back_to_general_query() {
        let analysis = rule_based_intent("What's the weather in Paris?");
        assert_eq!(analysis.intent_type, IntentType::GeneralQuery);
        assert_eq!(analysis.confidence, 0.3);
    }

    #[test]
    fn greeting_classifies_as_conversation() {
        let analysis = rule_based_intent("Hello there, how are you?");
        assert_eq!(analysis.intent_type, IntentType::Conversation);
    }
}
