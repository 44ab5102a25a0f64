//! Gateway configuration: the single YAML file that describes the listen
//! address, the upstream model to forward to, the tool servers to connect,
//! and the reasoning pipeline's own settings.

use std::{path::Path, time::Duration};

use serde::Deserialize;
use thiserror::Error;
use toolfleet::ToolServerConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("config invalid: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub servers: Vec<ToolServerConfig>,

    #[serde(default)]
    pub pool: PoolConfig,

    #[serde(default)]
    pub pipeline: PipelineSettings,

    #[serde(default = "default_health_check_interval_secs")]
    pub health_check_interval_secs: u64,

    #[serde(default = "default_auto_discovery_interval_secs")]
    pub auto_discovery_interval_secs: u64,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    pub base_url: String,

    /// Name of the environment variable holding the upstream API key, not
    /// the key itself — never put a secret in the config file.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    pub model: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl UpstreamConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Overrides the catalog's built-in discovery cache TTL when set.
    pub discovery_cache_ttl_secs: Option<u64>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            discovery_cache_ttl_secs: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineSettings {
    pub reasoning_model: Option<ReasoningModelSettings>,

    #[serde(default = "default_rule_based_only")]
    pub rule_based_only: bool,

    #[serde(default = "default_max_plan_execution_loops")]
    pub max_plan_execution_loops: u32,

    #[serde(default = "default_tool_timeout_secs")]
    pub default_tool_timeout_secs: u64,

    #[serde(default = "default_max_concurrent_tool_calls")]
    pub max_concurrent_tool_calls: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReasoningModelSettings {
    pub base_url: String,

    /// Name of the environment variable holding the reasoning model's API
    /// key, mirroring `UpstreamConfig::api_key_env`.
    pub api_key_env: Option<String>,

    pub model: String,

    #[serde(default = "default_reasoning_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl GatewayConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: GatewayConfig = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Required fields non-empty and each server config individually valid;
    /// serde already rejected unknown shapes before this runs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("upstream.base_url must not be empty".into()));
        }
        if self.upstream.model.trim().is_empty() {
            return Err(ConfigError::Invalid("upstream.model must not be empty".into()));
        }
        for server in &self.servers {
            server
                .validate()
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        }
        Ok(())
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_secs)
    }

    pub fn auto_discovery_interval(&self) -> Duration {
        Duration::from_secs(self.auto_discovery_interval_secs)
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_max_connections() -> usize {
    64
}

fn default_rule_based_only() -> bool {
    true
}

fn default_max_plan_execution_loops() -> u32 {
    0
}

fn default_tool_timeout_secs() -> u64 {
    30
}

fn default_max_concurrent_tool_calls() -> usize {
    8
}

fn default_reasoning_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_yaml_fills_in_defaults() {
        let yaml = r#"
upstream:
  base_url: "https://api.openai.com/v1"
  model: "gpt-4o-mini"
"#;
        let config: GatewayConfig = serde_yaml::from_str(yaml).expect("parse");
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.upstream.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.health_check_interval_secs, 60);
        assert_eq!(config.auto_discovery_interval_secs, 300);
        assert!(config.pipeline.rule_based_only);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_upstream_base_url_rejected() {
        let yaml = r#"
upstream:
  base_url: ""
  model: "gpt-4o-mini"
"#;
        let config: GatewayConfig = serde_yaml::from_str(yaml).expect("parse");
        assert!(config.validate().is_err());
    }

    #[test]
    fn servers_and_pipeline_sections_parse() {
        let yaml = r#"
upstream:
  base_url: "https://api.openai.com/v1"
  model: "gpt-4o-mini"
servers:
  - name: "tracker"
    transport: stdio
    command: "mcp-server-tracker"
pipeline:
  rule_based_only: false
  reasoning_model:
    base_url: "http://localhost:11434/v1"
    model: "qwen2.5:7b"
"#;
        let config: GatewayConfig = serde_yaml::from_str(yaml).expect("parse");
        assert_eq!(config.servers.len(), 1);
        assert!(!config.pipeline.rule_based_only);
        assert_eq!(
            config.pipeline.reasoning_model.as_ref().unwrap().model,
            "qwen2.5:7b"
        );
    }
}
