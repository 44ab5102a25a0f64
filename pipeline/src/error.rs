//! Reasoning pipeline error types.

use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("reasoning model call failed: {0}")]
    UpstreamFailure(String),

    #[error("reasoning model returned unparseable output: {0}")]
    ParseError(String),

    #[error("reasoning model call timed out")]
    Timeout,
}
