//! Tool fleet error types.

use thiserror::Error;

pub type ToolFleetResult<T> = Result<T, ToolFleetError>;

#[derive(Debug, Error)]
pub enum ToolFleetError {
    #[error("Configuration invalid: {0}")]
    ConfigInvalid(String),

    #[error("Server unhealthy: {0}")]
    ServerUnhealthy(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("No server available for tool '{0}'")]
    NoServer(String),

    #[error("Denied by filter: {0}")]
    DeniedByFilter(String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Upstream call failed: {0}")]
    UpstreamFailure(String),

    #[error("Server not found: {0}")]
    ServerNotFound(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Prompt not found: {0}")]
    PromptNotFound(String),

    #[error(transparent)]
    Sdk(#[from] Box<rmcp::RmcpError>),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
