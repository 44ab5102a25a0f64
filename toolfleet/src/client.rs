//! Tool-server client (C1): owns exactly one subprocess or HTTPS connection.

use std::{borrow::Cow, time::Duration};

use rmcp::{
    model::{
        CallToolRequestParam, CallToolResult, GetPromptRequestParam, GetPromptResult,
        ReadResourceRequestParam, ReadResourceResult,
    },
    service::RunningService,
    transport::{
        sse_client::SseClientConfig, ConfigureCommandExt, SseClientTransport, TokioChildProcess,
    },
    RoleClient, ServiceExt,
};
use serde_json::Map;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

use crate::{
    config::{Prompt, RawResource, Tool, ToolServerConfig, ToolServerTransport},
    error::{ToolFleetError, ToolFleetResult},
    handler::{RefreshRequest, ToolFleetClientHandler},
};

type InnerClient = RunningService<RoleClient, ToolFleetClientHandler>;

/// Capability counts cached from the last successful discovery, used for the
/// registry's runtime record without re-querying the server.
#[derive(Debug, Clone, Default)]
pub struct CapabilityCounts {
    pub tools: usize,
    pub resources: usize,
    pub prompts: usize,
}

/// One tool-server client. At most one in-flight request at a time: every
/// call takes `inflight` first, serializing concurrent callers on the
/// underlying stdin/stdout (or HTTP connection) exactly as a single
/// subprocess pipe requires.
pub struct ToolServerClient {
    config: ToolServerConfig,
    inner: Mutex<Option<InnerClient>>,
    inflight: Mutex<()>,
    counts: std::sync::RwLock<CapabilityCounts>,
}

impl ToolServerClient {
    pub fn new(config: ToolServerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(None),
            inflight: Mutex::new(()),
            counts: std::sync::RwLock::new(CapabilityCounts::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn is_connected(&self) -> bool {
        self.inner.try_lock().map(|g| g.is_some()).unwrap_or(true)
    }

    /// Connect this client's transport and perform the rmcp handshake.
    pub async fn connect(&self, refresh_tx: Option<mpsc::Sender<RefreshRequest>>) -> ToolFleetResult<()> {
        let mut handler = ToolFleetClientHandler::new(&self.config.name);
        if let Some(tx) = refresh_tx {
            handler = handler.with_refresh_channel(tx);
        }

        let connect_fut = async {
            match &self.config.transport {
                ToolServerTransport::Stdio {
                    command,
                    args,
                    envs,
                } => {
                    let transport = TokioChildProcess::new(
                        tokio::process::Command::new(command).configure(|cmd| {
                            cmd.args(args)
                                .envs(envs.iter())
                                .stderr(std::process::Stdio::inherit());
                        }),
                    )
                    .map_err(|e| ToolFleetError::Protocol(format!("spawn stdio transport: {e}")))?;

                    handler
                        .serve(transport)
                        .await
                        .map_err(|e| ToolFleetError::ServerUnhealthy(format!("handshake failed: {e}")))
                }
                ToolServerTransport::HttpSse { url, headers } => {
                    let mut builder = reqwest::Client::builder().connect_timeout(Duration::from_secs(10));
                    if !headers.is_empty() {
                        let mut map = reqwest::header::HeaderMap::new();
                        for (k, v) in headers {
                            if let (Ok(name), Ok(value)) = (
                                reqwest::header::HeaderName::from_bytes(k.as_bytes()),
                                reqwest::header::HeaderValue::from_str(v),
                            ) {
                                map.insert(name, value);
                            }
                        }
                        builder = builder.default_headers(map);
                    }
                    let http_client = builder
                        .build()
                        .map_err(|e| ToolFleetError::Protocol(format!("build http client: {e}")))?;

                    let cfg = SseClientConfig {
                        sse_endpoint: url.clone().into(),
                        ..Default::default()
                    };
                    let transport = SseClientTransport::start_with_client(http_client, cfg)
                        .await
                        .map_err(|e| ToolFleetError::Protocol(format!("create sse transport: {e}")))?;

                    handler
                        .serve(transport)
                        .await
                        .map_err(|e| ToolFleetError::ServerUnhealthy(format!("handshake failed: {e}")))
                }
            }
        };

        let client = tokio::time::timeout(self.config.timeout(), connect_fut)
            .await
            .map_err(|_| ToolFleetError::Timeout(format!("connect to '{}'", self.config.name)))??;

        info!(server = %self.config.name, "connected");
        *self.inner.lock().await = Some(client);
        Ok(())
    }

    /// Graceful shutdown: send the cancellation notice and drop the transport.
    /// Idempotent — calling on an already-disconnected client is a no-op.
    pub async fn disconnect(&self) {
        let client = self.inner.lock().await.take();
        if let Some(client) = client {
            let cancel = client.cancel();
            match tokio::time::timeout(Duration::from_secs(2), cancel).await {
                Ok(Ok(())) => info!(server = %self.config.name, "disconnected"),
                Ok(Err(e)) => warn!(server = %self.config.name, error = %e, "error during disconnect"),
                Err(_) => warn!(server = %self.config.name, "disconnect timed out, dropping transport"),
            }
        }
    }

    /// Serializes concurrent callers through `inflight`, then holds the
    /// connection lock for the duration of the call — the single in-flight
    /// contract this type exists to enforce.
    async fn with_client<F, Fut, T>(&self, f: F) -> ToolFleetResult<T>
    where
        F: FnOnce(&InnerClient) -> Fut,
        Fut: std::future::Future<Output = ToolFleetResult<T>>,
    {
        let _permit = self.inflight.lock().await;
        let guard = self.inner.lock().await;
        let client = guard
            .as_ref()
            .ok_or_else(|| ToolFleetError::ServerUnhealthy(self.config.name.clone()))?;
        f(client).await
    }

    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Map<String, serde_json::Value>>,
        timeout: Duration,
    ) -> ToolFleetResult<CallToolResult> {
        let name = name.to_string();
        let fut = self.with_client(|client| async move {
            let request = CallToolRequestParam {
                name: Cow::Owned(name),
                arguments,
            };
            client
                .call_tool(request)
                .await
                .map_err(|e| ToolFleetError::UpstreamFailure(e.to_string()))
        });
        tokio::time::timeout(timeout, fut)
            .await
            .map_err(|_| ToolFleetError::Timeout(format!("call_tool on '{}'", self.config.name)))?
    }

    pub async fn get_resource(&self, uri: &str) -> ToolFleetResult<ReadResourceResult> {
        let uri = uri.to_string();
        self.with_client(|client| async move {
            client
                .read_resource(ReadResourceRequestParam { uri })
                .await
                .map_err(|e| ToolFleetError::UpstreamFailure(e.to_string()))
        })
        .await
    }

    pub async fn get_prompt(
        &self,
        name: &str,
        arguments: Option<Map<String, serde_json::Value>>,
    ) -> ToolFleetResult<GetPromptResult> {
        let name = name.to_string();
        self.with_client(|client| async move {
            client
                .get_prompt(GetPromptRequestParam { name, arguments })
                .await
                .map_err(|e| ToolFleetError::UpstreamFailure(e.to_string()))
        })
        .await
    }

    /// Lightweight `tools/list` used as a liveness probe; updates the cached
    /// capability counts as a side effect.
    pub async fn health_check(&self) -> bool {
        let result = self
            .with_client(|client| async move {
                client
                    .list_all_tools()
                    .await
                    .map_err(|e| ToolFleetError::ServerUnhealthy(e.to_string()))
            })
            .await;

        match result {
            Ok(tools) => {
                self.counts.write().unwrap().tools = tools.len();
                true
            }
            Err(_) => false,
        }
    }

    pub async fn available_tools(&self) -> ToolFleetResult<Vec<Tool>> {
        self.with_client(|client| async move {
            client
                .list_all_tools()
                .await
                .map_err(|e| ToolFleetError::Protocol(e.to_string()))
        })
        .await
    }

    pub async fn available_resources(&self) -> ToolFleetResult<Vec<RawResource>> {
        self.with_client(|client| async move {
            client
                .list_all_resources()
                .await
                .map_err(|e| ToolFleetError::Protocol(e.to_string()))
                .map(|rs| rs.into_iter().map(|r| r.raw).collect())
        })
        .await
    }

    pub async fn available_prompts(&self) -> ToolFleetResult<Vec<Prompt>> {
        self.with_client(|client| async move {
            client
                .list_all_prompts()
                .await
                .map_err(|e| ToolFleetError::Protocol(e.to_string()))
        })
        .await
    }

    pub fn cached_counts(&self) -> CapabilityCounts {
        self.counts.read().unwrap().clone()
    }
}
