//! Tool fleet: connects to, discovers, and invokes tools across a set of
//! MCP-compatible tool servers.

pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod invoker;
pub mod registry;

pub use catalog::Catalog;
pub use client::ToolServerClient;
pub use config::{ToolServerConfig, ToolServerTransport};
pub use error::{ToolFleetError, ToolFleetResult};
pub use invoker::{ExecuteOptions, ExecuteRequest, ExecuteResult, ExecutionStrategy, ToolInvoker};
pub use registry::{RegistryStats, ServerInfo, ServerRegistry, ServerStatus};

use std::{sync::Arc, time::Duration};

/// Default interval for the background health monitor.
pub const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_secs(60);

/// Default interval for background auto-discovery.
pub const DEFAULT_DISCOVERY_INTERVAL: Duration = Duration::from_secs(300);

/// The fully assembled fleet: registry, catalog, and invoker wired together,
/// plus handles to the background timers.
pub struct ToolFleet {
    pub registry: Arc<ServerRegistry>,
    pub catalog: Arc<Catalog>,
    pub invoker: Arc<ToolInvoker>,
    health_task: tokio::task::JoinHandle<()>,
    discovery_task: tokio::task::JoinHandle<()>,
    refresh_task: tokio::task::JoinHandle<()>,
}

impl ToolFleet {
    pub async fn bootstrap(
        configs: Vec<ToolServerConfig>,
        strategy: ExecutionStrategy,
    ) -> ToolFleetResult<Self> {
        Self::bootstrap_with_intervals(
            configs,
            strategy,
            DEFAULT_HEALTH_INTERVAL,
            DEFAULT_DISCOVERY_INTERVAL,
        )
        .await
    }

    /// Same as [`Self::bootstrap`] but with caller-supplied health-check and
    /// auto-discovery intervals, for gateways that expose them as config.
    pub async fn bootstrap_with_intervals(
        configs: Vec<ToolServerConfig>,
        strategy: ExecutionStrategy,
        health_interval: Duration,
        discovery_interval: Duration,
    ) -> ToolFleetResult<Self> {
        let registry = Arc::new(ServerRegistry::new());
        let catalog = Arc::new(Catalog::new());

        for config in configs {
            registry.register_without_connect(config).await?;
        }
        registry.connect_all().await;
        registry.discover_all(&catalog).await;

        let invoker = Arc::new(ToolInvoker::new(Arc::clone(&registry), Arc::clone(&catalog), strategy));

        let health_task = registry.start_health_monitoring(health_interval);
        let discovery_task = registry.start_auto_discovery(Arc::clone(&catalog), discovery_interval);
        let refresh_task = registry.spawn_refresh_listener(Arc::clone(&catalog));

        Ok(Self {
            registry,
            catalog,
            invoker,
            health_task,
            discovery_task,
            refresh_task,
        })
    }

    /// Removes a server, disconnecting its client and clearing every
    /// catalog entry it owned.
    pub async fn unregister(&self, name: &str) {
        self.registry.unregister(name, &self.catalog).await;
    }

    /// Cancels both background timers and disconnects every client with a
    /// grace period, per the registry's own shutdown contract.
    pub async fn shutdown(self) {
        self.health_task.abort();
        self.discovery_task.abort();
        self.refresh_task.abort();
        self.registry.disconnect_all().await;
    }
}
