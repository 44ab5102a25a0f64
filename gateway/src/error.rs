//! Gateway error types and their HTTP representation.
//!
//! Every error kind carries the stable `code` string from the error
//! taxonomy in an `X-Gateway-Error-Code` header as well as the JSON
//! body, so callers can branch on it without parsing prose.

use axum::{
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use pipeline::PipelineError;
use serde::Serialize;
use thiserror::Error;
use toolfleet::ToolFleetError;

pub const HEADER_ERROR_CODE: &str = "X-Gateway-Error-Code";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("configuration invalid: {0}")]
    ConfigInvalid(String),

    #[error("no tool server available: {0}")]
    NoServer(String),

    #[error("tool server unhealthy: {0}")]
    ServerUnhealthy(String),

    #[error("request denied by filter: {0}")]
    DeniedByFilter(String),

    #[error("failed to parse upstream response: {0}")]
    ParseError(String),

    #[error("upstream call failed: {0}")]
    UpstreamFailure(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("request rejected: {0}")]
    BadRequest(String),
}

impl GatewayError {
    /// The stable machine-readable code from the error taxonomy.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::ConfigInvalid(_) => "config_invalid",
            GatewayError::NoServer(_) => "no_server",
            GatewayError::ServerUnhealthy(_) => "server_unhealthy",
            GatewayError::DeniedByFilter(_) => "denied_by_filter",
            GatewayError::ParseError(_) => "parse_error",
            GatewayError::UpstreamFailure(_) => "upstream_failure",
            GatewayError::Timeout(_) => "timeout",
            GatewayError::BadRequest(_) => "protocol_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            GatewayError::ConfigInvalid(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::NoServer(_) => StatusCode::FAILED_DEPENDENCY,
            GatewayError::ServerUnhealthy(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::DeniedByFilter(_) => StatusCode::FORBIDDEN,
            GatewayError::ParseError(_) => StatusCode::BAD_GATEWAY,
            GatewayError::UpstreamFailure(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// Tool-fleet failures only ever surface from the pipeline's best-effort
/// tool calls, which already degrade to a `no_server`/error result per
/// step rather than aborting the request — this conversion exists for the
/// handful of call sites (startup, admin endpoints) that propagate one
/// directly.
impl From<ToolFleetError> for GatewayError {
    fn from(e: ToolFleetError) -> Self {
        match e {
            ToolFleetError::ConfigInvalid(m) => GatewayError::ConfigInvalid(m),
            ToolFleetError::ServerUnhealthy(m) => GatewayError::ServerUnhealthy(m),
            ToolFleetError::NoServer(m) | ToolFleetError::ServerNotFound(m) | ToolFleetError::ToolNotFound(m) => {
                GatewayError::NoServer(m)
            }
            ToolFleetError::DeniedByFilter(m) => GatewayError::DeniedByFilter(m),
            ToolFleetError::ParseError(m) => GatewayError::ParseError(m),
            ToolFleetError::Timeout(m) => GatewayError::Timeout(m),
            ToolFleetError::ResourceNotFound(m) | ToolFleetError::PromptNotFound(m) => GatewayError::NoServer(m),
            ToolFleetError::Protocol(m) => GatewayError::UpstreamFailure(m),
            ToolFleetError::UpstreamFailure(m) => GatewayError::UpstreamFailure(m),
            ToolFleetError::Sdk(e) => GatewayError::UpstreamFailure(e.to_string()),
            ToolFleetError::Io(e) => GatewayError::UpstreamFailure(e.to_string()),
            ToolFleetError::Http(e) => GatewayError::UpstreamFailure(e.to_string()),
        }
    }
}

impl From<PipelineError> for GatewayError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::UpstreamFailure(m) => GatewayError::UpstreamFailure(m),
            PipelineError::ParseError(m) => GatewayError::ParseError(m),
            PipelineError::Timeout => GatewayError::Timeout("reasoning model call timed out".to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    code: &'static str,
    message: &'a str,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let message = self.to_string();

        let mut headers = HeaderMap::with_capacity(1);
        if let Ok(value) = HeaderValue::from_str(code) {
            headers.insert(HEADER_ERROR_CODE, value);
        }

        (
            status,
            headers,
            Json(ErrorBody {
                error: ErrorDetail {
                    code,
                    message: &message,
                },
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_server_maps_to_failed_dependency() {
        let err = GatewayError::NoServer("no server exposes 'search'".to_string());
        assert_eq!(err.status(), StatusCode::FAILED_DEPENDENCY);
        assert_eq!(err.code(), "no_server");
    }

    #[test]
    fn tool_fleet_timeout_converts_to_gateway_timeout() {
        let err: GatewayError = ToolFleetError::Timeout("tool took too long".to_string()).into();
        assert!(matches!(err, GatewayError::Timeout(_)));
        assert_eq!(err.code(), "timeout");
    }
}
