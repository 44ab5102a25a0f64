//! Server registry (C2): lifecycle, health monitoring, and retry budget for
//! the set of configured tool servers.

use std::{sync::Arc, time::Duration};

use tokio::sync::{mpsc, Mutex as AsyncMutex, RwLock};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::{
    catalog::{AvailabilityStatus, Catalog, PromptArgument, PromptEntry, ResourceEntry, ToolEntry},
    client::ToolServerClient,
    config::ToolServerConfig,
    error::{ToolFleetError, ToolFleetResult},
    handler::RefreshRequest,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    Disabled,
    Disconnected,
    Connecting,
    Connected,
    Error,
}

pub struct ServerRecord {
    pub config: ToolServerConfig,
    pub status: ServerStatus,
    pub client: Option<Arc<ToolServerClient>>,
    pub last_health_check: Option<Instant>,
    pub last_connect_attempt: Option<Instant>,
    pub connection_attempts: u32,
    pub tool_count: usize,
    pub resource_count: usize,
    pub prompt_count: usize,
    pub last_error: Option<String>,
}

impl ServerRecord {
    fn new(config: ToolServerConfig) -> Self {
        let status = if config.enabled {
            ServerStatus::Disconnected
        } else {
            ServerStatus::Disabled
        };
        Self {
            config,
            status,
            client: None,
            last_health_check: None,
            last_connect_attempt: None,
            connection_attempts: 0,
            tool_count: 0,
            resource_count: 0,
            prompt_count: 0,
            last_error: None,
        }
    }

    /// Retry is allowed iff the attempt budget isn't spent and enough time
    /// has passed since the last attempt.
    fn can_retry(&self) -> bool {
        if self.connection_attempts >= self.config.retry_attempts {
            return false;
        }
        match self.last_connect_attempt {
            None => true,
            Some(last) => last.elapsed() >= self.config.retry_delay(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub name: String,
    pub status: ServerStatus,
    pub connection_attempts: u32,
    pub tool_count: usize,
    pub resource_count: usize,
    pub prompt_count: usize,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RegistryStats {
    pub total: usize,
    pub connected: usize,
    pub disconnected: usize,
    pub error: usize,
    pub disabled: usize,
}

/// Holds `name -> runtime record` for every registered tool server.
pub struct ServerRegistry {
    records: dashmap::DashMap<String, RwLock<ServerRecord>>,
    refresh_tx: mpsc::Sender<RefreshRequest>,
    refresh_rx: AsyncMutex<Option<mpsc::Receiver<RefreshRequest>>>,
}

impl ServerRegistry {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(64);
        Self {
            records: dashmap::DashMap::new(),
            refresh_tx: tx,
            refresh_rx: AsyncMutex::new(Some(rx)),
        }
    }

    /// Validate and insert a record, without connecting.
    async fn insert_record(&self, config: ToolServerConfig) -> ToolFleetResult<()> {
        config.validate()?;
        let name = config.name.clone();
        self.records
            .insert(name, RwLock::new(ServerRecord::new(config)));
        Ok(())
    }

    /// Validate and insert a record; triggers an asynchronous connect if the
    /// server is enabled.
    pub async fn register(self: &Arc<Self>, config: ToolServerConfig) -> ToolFleetResult<()> {
        let name = config.name.clone();
        let enabled = config.enabled;
        self.insert_record(config).await?;

        if enabled {
            let this = Arc::clone(self);
            tokio::spawn(async move {
                if let Err(e) = this.connect(&name).await {
                    warn!(server = %name, error = %e, "initial connect failed");
                }
            });
        }
        Ok(())
    }

    /// Validate and insert a record without spawning a connect attempt — for
    /// bulk bootstrap callers that drive connection themselves via
    /// `connect_all`, so a server registered this way is never connected
    /// twice.
    pub async fn register_without_connect(&self, config: ToolServerConfig) -> ToolFleetResult<()> {
        self.insert_record(config).await
    }

    /// Removes the record, disconnects its client, and clears every catalog
    /// entry (and side-index entry) this server owned.
    pub async fn unregister(&self, name: &str, catalog: &Catalog) {
        if let Some((_, record)) = self.records.remove(name) {
            let record = record.into_inner();
            if let Some(client) = record.client {
                client.disconnect().await;
            }
        }
        catalog.clear_server(name);
    }

    async fn set_status(&self, name: &str, status: ServerStatus) {
        if let Some(record) = self.records.get(name) {
            record.write().await.status = status;
        }
    }

    pub async fn connect(&self, name: &str) -> ToolFleetResult<()> {
        let config = {
            let record = self
                .records
                .get(name)
                .ok_or_else(|| ToolFleetError::ServerNotFound(name.to_string()))?;
            record.read().await.config.clone()
        };

        self.set_status(name, ServerStatus::Connecting).await;

        let client = Arc::new(ToolServerClient::new(config));
        let result = client.connect(Some(self.refresh_tx.clone())).await;

        let mut record = self
            .records
            .get(name)
            .ok_or_else(|| ToolFleetError::ServerNotFound(name.to_string()))?
            .write()
            .await;
        record.last_connect_attempt = Some(Instant::now());

        match result {
            Ok(()) => {
                record.client = Some(client);
                record.status = ServerStatus::Connected;
                record.connection_attempts = 0;
                record.last_error = None;
                Ok(())
            }
            Err(e) => {
                record.connection_attempts += 1;
                record.status = ServerStatus::Error;
                record.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    pub async fn disconnect(&self, name: &str) {
        let client = match self.records.get(name) {
            Some(record) => {
                let mut guard = record.write().await;
                let client = guard.client.take();
                guard.status = ServerStatus::Disconnected;
                client
            }
            None => None,
        };
        if let Some(client) = client {
            client.disconnect().await;
        }
    }

    /// Fan out a connect to every enabled server; returns the number that
    /// succeeded.
    pub async fn connect_all(self: &Arc<Self>) -> usize {
        let names: Vec<String> = self
            .records
            .iter()
            .filter(|r| r.value().try_read().map(|g| g.config.enabled).unwrap_or(false))
            .map(|r| r.key().clone())
            .collect();

        let mut handles = Vec::new();
        for name in names {
            let this = Arc::clone(self);
            handles.push(tokio::spawn(async move { this.connect(&name).await.is_ok() }));
        }

        let mut ok = 0;
        for h in handles {
            if let Ok(true) = h.await {
                ok += 1;
            }
        }
        ok
    }

    pub async fn disconnect_all(&self) {
        let names: Vec<String> = self.records.iter().map(|r| r.key().clone()).collect();
        for name in names {
            self.disconnect(&name).await;
        }
    }

    pub async fn get_server_info(&self, name: &str) -> Option<ServerInfo> {
        let record = self.records.get(name)?;
        let record = record.read().await;
        Some(ServerInfo {
            name: name.to_string(),
            status: record.status,
            connection_attempts: record.connection_attempts,
            tool_count: record.tool_count,
            resource_count: record.resource_count,
            prompt_count: record.prompt_count,
            last_error: record.last_error.clone(),
        })
    }

    pub async fn get_connected_servers(&self) -> Vec<String> {
        let mut names = Vec::new();
        for r in self.records.iter() {
            if r.value().read().await.status == ServerStatus::Connected {
                names.push(r.key().clone());
            }
        }
        names
    }

    pub fn client(&self, name: &str) -> Option<Arc<ToolServerClient>> {
        self.records.get(name).and_then(|r| {
            r.try_read()
                .ok()
                .and_then(|guard| guard.client.clone())
        })
    }

    pub async fn get_registry_stats(&self) -> RegistryStats {
        let mut stats = RegistryStats::default();
        for r in self.records.iter() {
            stats.total += 1;
            match r.value().read().await.status {
                ServerStatus::Connected => stats.connected += 1,
                ServerStatus::Disconnected | ServerStatus::Connecting => stats.disconnected += 1,
                ServerStatus::Error => stats.error += 1,
                ServerStatus::Disabled => stats.disabled += 1,
            }
        }
        stats
    }

    /// Launches the periodic health-probe / reconnect task. The returned
    /// handle's lifetime is the caller's responsibility (normally aborted on
    /// shutdown).
    pub fn start_health_monitoring(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                this.health_monitor_tick().await;
            }
        })
    }

    async fn health_monitor_tick(&self) {
        let names: Vec<String> = self.records.iter().map(|r| r.key().clone()).collect();
        let checks = names.into_iter().map(|name| self.health_check_one(name));
        futures::future::join_all(checks).await;
    }

    /// Probes (and reconnects, if needed) a single server. Isolated per-server
    /// so `health_monitor_tick` can run every server's check concurrently.
    async fn health_check_one(&self, name: String) {
        let (status, can_retry) = {
            let Some(record) = self.records.get(&name) else {
                return;
            };
            let record = record.read().await;
            (record.status, record.can_retry())
        };

        match status {
            ServerStatus::Connected => {
                let healthy = match self.client(&name) {
                    Some(client) => client.health_check().await,
                    None => false,
                };
                if let Some(record) = self.records.get(&name) {
                    record.write().await.last_health_check = Some(Instant::now());
                }
                if !healthy {
                    warn!(server = %name, "health check failed, disconnecting");
                    self.disconnect(&name).await;
                    if can_retry {
                        let _ = self.connect(&name).await;
                    }
                }
            }
            ServerStatus::Disconnected | ServerStatus::Error => {
                if can_retry {
                    let _ = self.connect(&name).await;
                }
            }
            ServerStatus::Disabled | ServerStatus::Connecting => {}
        }
    }

    /// Re-discover tools/resources/prompts for every currently connected
    /// server, respecting each server's discovery-cache freshness, and merge
    /// the result into `catalog`. Failures on one server never affect
    /// another.
    pub async fn discover_all(&self, catalog: &Catalog) {
        let connected = self.get_connected_servers().await;
        let tasks = connected.into_iter().filter(|name| !catalog.is_discovery_fresh(name)).map(|name| async move {
            if let Err(e) = self.discover_one(&name, catalog).await {
                warn!(server = %name, error = %e, "discovery failed");
            }
        });
        futures::future::join_all(tasks).await;
    }

    async fn discover_one(&self, name: &str, catalog: &Catalog) -> ToolFleetResult<()> {
        let client = self
            .client(name)
            .ok_or_else(|| ToolFleetError::ServerNotFound(name.to_string()))?;

        let tools = client.available_tools().await?;
        let resources = client.available_resources().await?;
        let prompts = client.available_prompts().await?;

        catalog.clear_server(name);
        for tool in &tools {
            catalog.insert_tool(ToolEntry::new(
                tool.name.to_string(),
                name,
                tool.description.as_ref().map(|d| d.to_string()),
                (*tool.input_schema).clone(),
            ));
        }
        for resource in &resources {
            catalog.insert_resource(ResourceEntry::new(
                resource.uri.clone(),
                name,
                resource.name.clone(),
                resource.description.clone(),
                resource.mime_type.clone(),
            ));
        }
        for prompt in &prompts {
            let args = prompt
                .arguments
                .as_ref()
                .map(|args| {
                    args.iter()
                        .map(|a| PromptArgument {
                            name: a.name.clone(),
                            description: a.description.clone(),
                            required: a.required.unwrap_or(false),
                        })
                        .collect()
                })
                .unwrap_or_default();
            catalog.insert_prompt(PromptEntry::new(
                prompt.name.clone(),
                name,
                prompt.description.clone(),
                args,
            ));
        }

        if let Some(record) = self.records.get(name) {
            let mut record = record.write().await;
            record.tool_count = tools.len();
            record.resource_count = resources.len();
            record.prompt_count = prompts.len();
        }

        catalog.mark_discovered(name);
        info!(server = %name, tools = tools.len(), resources = resources.len(), prompts = prompts.len(), "discovered capabilities");
        Ok(())
    }

    pub fn start_auto_discovery(
        self: &Arc<Self>,
        catalog: Arc<Catalog>,
        interval: Duration,
    ) -> tokio::task::JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                this.discover_all(&catalog).await;
            }
        })
    }

    /// Drains pending tool/resource/prompt-list-changed notifications and
    /// re-discovers the reporting server's capabilities immediately.
    pub fn spawn_refresh_listener(self: &Arc<Self>, catalog: Arc<Catalog>) -> tokio::task::JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut rx = this.refresh_rx.lock().await.take().expect("listener already spawned");
            while let Some(req) = rx.recv().await {
                if let Err(e) = this.discover_one(&req.server_name, &catalog).await {
                    warn!(server = %req.server_name, error = %e, "refresh-triggered discovery failed");
                }
            }
        })
    }

    pub fn find_servers_with_tool<'a>(&self, catalog: &'a Catalog, tool_name: &str) -> Vec<String> {
        catalog.servers_for(tool_name)
    }
}

impl Default for ServerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolServerTransport;
    use std::collections::HashMap;

    fn config(name: &str, enabled: bool) -> ToolServerConfig {
        ToolServerConfig {
            name: name.into(),
            transport: ToolServerTransport::Stdio {
                command: "true".into(),
                args: vec![],
                envs: HashMap::new(),
            },
            enabled,
            timeout_secs: 5,
            retry_attempts: 3,
            retry_delay_ms: 10,
        }
    }

    #[tokio::test]
    async fn register_disabled_server_stays_disabled() {
        let registry = Arc::new(ServerRegistry::new());
        registry.register(config("s1", false)).await.unwrap();
        let info = registry.get_server_info("s1").await.unwrap();
        assert_eq!(info.status, ServerStatus::Disabled);
    }

    #[tokio::test]
    async fn unregister_removes_record() {
        let registry = Arc::new(ServerRegistry::new());
        let catalog = Catalog::new();
        registry.register(config("s1", false)).await.unwrap();
        registry.unregister("s1", &catalog).await;
        assert!(registry.get_server_info("s1").await.is_none());
    }

    #[tokio::test]
    async fn unregister_clears_catalog_entries_owned_by_that_server() {
        let registry = Arc::new(ServerRegistry::new());
        let catalog = Catalog::new();
        registry.register(config("s1", false)).await.unwrap();
        catalog.insert_tool(ToolEntry::new(
            "find_assigned_tickets",
            "s1",
            None,
            serde_json::Map::new(),
        ));

        registry.unregister("s1", &catalog).await;

        assert!(catalog.tool("find_assigned_tickets").is_none());
        assert!(catalog.servers_for("find_assigned_tickets").is_empty());
    }

    #[tokio::test]
    async fn registry_stats_count_disabled() {
        let registry = Arc::new(ServerRegistry::new());
        registry.register(config("s1", false)).await.unwrap();
        registry.register(config("s2", false)).await.unwrap();
        let stats = registry.get_registry_stats().await;
        assert_eq!(stats.total, 2);
        assert_eq!(stats.disabled, 2);
    }

    #[test]
    fn empty_name_rejected_before_insertion() {
        let bad = config("", true);
        assert!(bad.validate().is_err());
    }
}
