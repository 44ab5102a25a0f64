//! Shared application state constructed once at startup and handed to
//! every request handler behind an `Arc`.

use std::sync::Arc;
use std::time::Duration;

use pipeline::{PipelineConfig, PipelineRunner, ReasoningModelConfig};
use toolfleet::{invoker::ExecutionStrategy, Catalog, ServerRegistry, ToolFleet, ToolInvoker};

use crate::config::GatewayConfig;
use crate::error::GatewayError;

/// Everything a request handler needs: the connected tool fleet, the
/// reasoning pipeline, and an HTTP client configured for the upstream
/// model. `fleet` owns the registry/catalog/invoker `Arc`s and the
/// background health/discovery/refresh timers; `shutdown` delegates to it.
pub struct AppState {
    pub fleet: ToolFleet,
    pub pipeline: PipelineRunner,
    pub upstream: UpstreamClient,
}

impl AppState {
    pub fn registry(&self) -> &Arc<ServerRegistry> {
        &self.fleet.registry
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.fleet.catalog
    }

    pub fn invoker(&self) -> &Arc<ToolInvoker> {
        &self.fleet.invoker
    }
}

#[derive(Clone)]
pub struct UpstreamClient {
    pub http: reqwest::Client,
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub request_timeout: Duration,
}

impl UpstreamClient {
    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

impl AppState {
    pub async fn bootstrap(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let api_key = std::env::var(&config.upstream.api_key_env).ok();
        let upstream = UpstreamClient {
            http: reqwest::Client::builder()
                .timeout(config.upstream.request_timeout())
                .pool_max_idle_per_host(config.pool.max_connections)
                .build()
                .map_err(|e| GatewayError::ConfigInvalid(e.to_string()))?,
            base_url: config.upstream.base_url.clone(),
            api_key,
            model: config.upstream.model.clone(),
            request_timeout: config.upstream.request_timeout(),
        };

        let fleet = ToolFleet::bootstrap_with_intervals(
            config.servers.clone(),
            ExecutionStrategy::default(),
            config.health_check_interval(),
            config.auto_discovery_interval(),
        )
        .await?;

        let reasoning_model = config.pipeline.reasoning_model.as_ref().map(|m| ReasoningModelConfig {
            base_url: m.base_url.clone(),
            api_key: m
                .api_key_env
                .as_ref()
                .and_then(|var| std::env::var(var).ok()),
            model: m.model.clone(),
            timeout: Duration::from_secs(m.timeout_secs),
        });
        let pipeline_config = PipelineConfig {
            reasoning_model,
            rule_based_only: config.pipeline.rule_based_only,
            max_plan_execution_loops: config.pipeline.max_plan_execution_loops,
            default_tool_timeout: Duration::from_secs(config.pipeline.default_tool_timeout_secs),
            max_concurrent_tool_calls: config.pipeline.max_concurrent_tool_calls,
        };
        let pipeline = PipelineRunner::new(pipeline_config, Arc::clone(&fleet.invoker));

        Ok(Self {
            fleet,
            pipeline,
            upstream,
        })
    }

    pub async fn shutdown(self) {
        self.fleet.shutdown().await;
    }
}
