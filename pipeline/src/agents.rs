//! Agents are the polymorphic (LLM-backed | rule-based) strategy attached to
//! each phase via dynamic dispatch over agents. The LLM-backed
//! implementation treats its output as untrusted text: it scans for the
//! first top-level JSON object and falls back to the rule-based
//! implementation on any failure to parse it.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::{PipelineError, PipelineResult};

#[derive(Debug, Clone)]
pub struct ReasoningModelConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

/// A phase's backend: either consult the configured reasoning model, or go
/// straight to the deterministic rule-based implementation. Constructed once
/// per `PipelineRunner` and shared across phases/requests.
#[derive(Clone)]
pub enum AgentBackend {
    LlmBacked(LlmAgent),
    RuleBased,
}

#[derive(Clone)]
pub struct LlmAgent {
    client: reqwest::Client,
    config: ReasoningModelConfig,
}

impl LlmAgent {
    pub fn new(config: ReasoningModelConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Issue one chat-completion call with `system_prompt` and `user_prompt`
    /// and return the raw text content of the first choice — mirrors the
    /// original agents' single-call-per-phase shape.
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> PipelineResult<String> {
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
            "stream": false,
        });

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url.trim_end_matches('/')))
            .json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = tokio::time::timeout(self.config.timeout, request.send())
            .await
            .map_err(|_| PipelineError::Timeout)?
            .map_err(|e| PipelineError::UpstreamFailure(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PipelineError::UpstreamFailure(format!(
                "reasoning model returned status {}",
                response.status()
            )));
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PipelineError::UpstreamFailure(e.to_string()))?;

        value
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| PipelineError::ParseError("no choices[0].message.content in response".to_string()))
    }

    /// Call the model, then parse the first top-level `{...}` object out of
    /// its response as `T`.
    pub async fn structured_call<T: DeserializeOwned>(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> PipelineResult<T> {
        let text = self.complete(system_prompt, user_prompt).await?;
        extract_json_object(&text)
    }
}

/// Brace-match the first top-level JSON object in `text` and deserialize it
/// as `T`. Tolerant of surrounding prose ("Here's my analysis: {...}").
pub fn extract_json_object<T: DeserializeOwned>(text: &str) -> PipelineResult<T> {
    let start = text
        .find('{')
        .ok_or_else(|| PipelineError::ParseError("no '{' found in model output".to_string()))?;

    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    let mut end = None;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(i + 1);
                    break;
                }
            }
            _ => {}
        }
    }

    let end = end.ok_or_else(|| PipelineError::ParseError("unbalanced braces in model output".to_string()))?;
    let candidate = &text[start..end];
    serde_json::from_str(candidate).map_err(|e| PipelineError::ParseError(e.to_string()))
}

/// Run an LLM-backed call and fall back to `fallback` on any failure,
/// logging why the fallback was taken.
pub async fn with_fallback<T, F, Fut>(
    backend: &AgentBackend,
    phase: &'static str,
    llm_call: F,
    fallback: impl FnOnce() -> T,
) -> T
where
    F: FnOnce(LlmAgent) -> Fut,
    Fut: std::future::Future<Output = PipelineResult<T>>,
{
    match backend {
        AgentBackend::RuleBased => fallback(),
        AgentBackend::LlmBacked(agent) => match llm_call(agent.clone()).await {
            Ok(value) => value,
            Err(e) => {
                warn!(phase, error = %e, "llm agent failed, using rule-based fallback");
                fallback()
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, Debug, PartialEq)]
    struct Sample {
        a: i32,
        b: String,
    }

    #[test]
    fn extracts_json_object_embedded_in_prose() {
        let text = r#"Sure, here's the analysis: {"a": 1, "b": "hi"} — hope that helps."#;
        let parsed: Sample = extract_json_object(text).unwrap();
        assert_eq!(parsed, Sample { a: 1, b: "hi".to_string() });
    }

    #[test]
    fn handles_nested_braces_and_string_escapes() {
        let text = r#"{"a": 1, "b": "a \"quoted\" {value}"}"#;
        let parsed: Sample = extract_json_object(text).unwrap();
        assert_eq!(parsed.b, "a \"quoted\" {value}");
    }

    #[test]
    fn no_brace_is_a_parse_error() {
        let result: PipelineResult<Sample> = extract_json_object("no json here");
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn fallback_runs_for_rule_based_backend() {
        let backend = AgentBackend::RuleBased;
        let result = with_fallback(
            &backend,
            "test",
            |agent: LlmAgent| async move { agent.structured_call::<Sample>("sys", "user").await },
            || Sample { a: 42, b: "fallback".to_string() },
        )
        .await;
        assert_eq!(result.a, 42);
    }
}
