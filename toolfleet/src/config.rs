//! Tool-server configuration types.

use std::{collections::HashMap, fmt, time::Duration};

pub use rmcp::model::{Prompt, RawResource, Tool};
use serde::{Deserialize, Serialize};

use crate::error::{ToolFleetError, ToolFleetResult};

/// Immutable descriptor for one tool server, validated on registration.
#[derive(Clone, Deserialize, Serialize)]
pub struct ToolServerConfig {
    pub name: String,
    #[serde(flatten)]
    pub transport: ToolServerTransport,

    /// Whether this server should be connected at startup.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Per-call timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connection retry attempts before the registry gives up for a cycle.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Base delay between retries in milliseconds (exponential backoff).
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl ToolServerConfig {
    /// Required fields non-empty, transport already rejects unknown kinds at
    /// the serde layer — this only checks the fields serde can't.
    pub fn validate(&self) -> ToolFleetResult<()> {
        if self.name.trim().is_empty() {
            return Err(ToolFleetError::ConfigInvalid(
                "server name must not be empty".into(),
            ));
        }
        match &self.transport {
            ToolServerTransport::Stdio { command, .. } if command.trim().is_empty() => {
                Err(ToolFleetError::ConfigInvalid(format!(
                    "server '{}': stdio transport requires a non-empty command",
                    self.name
                )))
            }
            ToolServerTransport::HttpSse { url, .. } if url.trim().is_empty() => {
                Err(ToolFleetError::ConfigInvalid(format!(
                    "server '{}': http-sse transport requires a non-empty url",
                    self.name
                )))
            }
            _ => Ok(()),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Clone, Deserialize, Serialize)]
#[serde(tag = "transport", rename_all = "kebab-case")]
pub enum ToolServerTransport {
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        envs: HashMap<String, String>,
    },
    HttpSse {
        url: String,
        #[serde(default)]
        headers: HashMap<String, String>,
    },
}

impl fmt::Debug for ToolServerTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolServerTransport::Stdio {
                command,
                args,
                envs,
            } => f
                .debug_struct("Stdio")
                .field("command", command)
                .field("args", args)
                .field("envs", &format!("{} vars", envs.len()))
                .finish(),
            ToolServerTransport::HttpSse { url, headers } => f
                .debug_struct("HttpSse")
                .field("url", url)
                .field("headers", &format!("{} headers", headers.len()))
                .finish(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retry_attempts() -> u32 {
    5
}

fn default_retry_delay_ms() -> u64 {
    500
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_stdio_server() {
        let yaml = r#"
name: "filesystem"
transport: stdio
command: "mcp-server-fs"
args: ["--root", "/data"]
"#;
        let config: ToolServerConfig = serde_yaml::from_str(yaml).expect("parse");
        assert_eq!(config.name, "filesystem");
        assert!(config.enabled);
        assert_eq!(config.timeout_secs, 30);
        match config.transport {
            ToolServerTransport::Stdio { command, args, .. } => {
                assert_eq!(command, "mcp-server-fs");
                assert_eq!(args, vec!["--root", "/data"]);
            }
            _ => panic!("expected stdio transport"),
        }
        assert!(config.validate().is_ok());
    }

    #[test]
    fn yaml_http_sse_server() {
        let yaml = r#"
name: "brave"
transport: http-sse
url: "https://mcp.brave.com/sse"
enabled: false
"#;
        let config: ToolServerConfig = serde_yaml::from_str(yaml).expect("parse");
        assert!(!config.enabled);
        match config.transport {
            ToolServerTransport::HttpSse { url, .. } => {
                assert_eq!(url, "https://mcp.brave.com/sse")
            }
            _ => panic!("expected http-sse transport"),
        }
    }

    #[test]
    fn empty_command_rejected() {
        let config = ToolServerConfig {
            name: "bad".into(),
            transport: ToolServerTransport::Stdio {
                command: "".into(),
                args: vec![],
                envs: HashMap::new(),
            },
            enabled: true,
            timeout_secs: 30,
            retry_attempts: 5,
            retry_delay_ms: 500,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_transport_rejected_at_parse() {
        let yaml = r#"
name: "bad"
transport: carrier-pigeon
"#;
        let result: Result<ToolServerConfig, _> = serde_yaml::from_str(yaml);
        assert!(result.is_err());
    }
}
