//! Unified tool invoker (C4): the pipeline's single entry point for calling
//! any catalog tool, with server selection, a result cache, batch execution,
//! and pre-call filters.

use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use dashmap::DashMap;
use rand::Rng;
use serde_json::{Map, Value};
use tokio::{sync::Semaphore, time::Instant};
use tracing::warn;

use crate::{
    catalog::Catalog,
    error::{ToolFleetError, ToolFleetResult},
    registry::ServerRegistry,
};

const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);
const CACHE_EVICTION_THRESHOLD: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionStrategy {
    #[default]
    FirstAvailable,
    RoundRobin,
    FastestResponse,
    LeastUsed,
    Random,
}

/// Predicate over `(tool_name, arguments)`; any `false` rejects the call.
pub type ToolFilter = Arc<dyn Fn(&str, &Map<String, Value>) -> bool + Send + Sync>;

#[derive(Clone, Default)]
pub struct ExecuteOptions {
    pub server_name: Option<String>,
    pub cache_ttl: Option<Duration>,
    pub timeout: Option<Duration>,
    pub use_cache: bool,
}

#[derive(Debug, Clone)]
pub struct ExecuteResult {
    pub success: bool,
    pub result: Option<Value>,
    pub error_message: Option<String>,
    pub server_name: Option<String>,
    pub execution_time_ms: u64,
    pub tool_name: String,
}

#[derive(Debug, Clone)]
pub struct ExecuteRequest {
    pub tool_name: String,
    pub arguments: Map<String, Value>,
    pub options: ExecuteOptions,
}

struct CacheEntry {
    result: Value,
    server_name: String,
    inserted_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() >= self.ttl
    }
}

/// Stable cache key over `(tool_name, server, arguments)` with arguments
/// canonicalized by key-sorted JSON so insertion order never changes the key.
/// Recursively re-sorts object keys so that two argument maps built in a
/// different insertion order serialize identically. `serde_json::Map`
/// preserves insertion order (the workspace enables `preserve_order`), so a
/// plain `to_string` is not enough on its own.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: std::collections::BTreeMap<String, Value> =
                map.iter().map(|(k, v)| (k.clone(), canonicalize(v))).collect();
            serde_json::to_value(sorted).unwrap_or(Value::Null)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

fn cache_key(tool_name: &str, server_hint: Option<&str>, arguments: &Map<String, Value>) -> u64 {
    let canonical = serde_json::to_string(&canonicalize(&Value::Object(arguments.clone()))).unwrap_or_default();
    let mut hasher = DefaultHasher::new();
    tool_name.hash(&mut hasher);
    server_hint.unwrap_or("").hash(&mut hasher);
    canonical.hash(&mut hasher);
    hasher.finish()
}

pub struct ToolInvoker {
    registry: Arc<ServerRegistry>,
    catalog: Arc<Catalog>,
    strategy: ExecutionStrategy,
    filters: Vec<ToolFilter>,
    cache: DashMap<u64, CacheEntry>,
    round_robin_counters: DashMap<String, AtomicUsize>,
}

impl ToolInvoker {
    pub fn new(registry: Arc<ServerRegistry>, catalog: Arc<Catalog>, strategy: ExecutionStrategy) -> Self {
        Self {
            registry,
            catalog,
            strategy,
            filters: Vec::new(),
            cache: DashMap::new(),
            round_robin_counters: DashMap::new(),
        }
    }

    pub fn add_filter(&mut self, filter: ToolFilter) {
        self.filters.push(filter);
    }

    async fn healthy_candidates(&self, tool_name: &str, server_override: Option<&str>) -> Vec<String> {
        if let Some(name) = server_override {
            let connected = self.registry.get_connected_servers().await;
            return if connected.iter().any(|s| s == name) {
                vec![name.to_string()]
            } else {
                Vec::new()
            };
        }

        let connected = self.registry.get_connected_servers().await;
        self.catalog
            .servers_for(tool_name)
            .into_iter()
            .filter(|s| connected.contains(s))
            .collect()
    }

    fn select(&self, tool_name: &str, candidates: &[String]) -> String {
        match self.strategy {
            ExecutionStrategy::FirstAvailable => candidates[0].clone(),
            ExecutionStrategy::RoundRobin => {
                let counter = self
                    .round_robin_counters
                    .entry(tool_name.to_string())
                    .or_insert_with(|| AtomicUsize::new(0));
                let idx = counter.fetch_add(1, Ordering::Relaxed) % candidates.len();
                candidates[idx].clone()
            }
            ExecutionStrategy::FastestResponse => {
                candidates
                    .iter()
                    .min_by_key(|server| {
                        let qualified = format!("{server}.{tool_name}");
                        self.catalog
                            .tools_for_server(server)
                            .into_iter()
                            .find(|t| t.name == tool_name || t.name == qualified)
                            .and_then(|t| t.response_time_ms)
                            .unwrap_or(u64::MAX)
                    })
                    .cloned()
                    .unwrap_or_else(|| candidates[0].clone())
            }
            ExecutionStrategy::LeastUsed => candidates
                .iter()
                .min_by_key(|server| {
                    let qualified = format!("{server}.{tool_name}");
                    self.catalog
                        .tools_for_server(server)
                        .into_iter()
                        .find(|t| t.name == tool_name || t.name == qualified)
                        .map(|t| t.usage_count)
                        .unwrap_or(0)
                })
                .cloned()
                .unwrap_or_else(|| candidates[0].clone()),
            ExecutionStrategy::Random => {
                let idx = rand::rng().random_range(0..candidates.len());
                candidates[idx].clone()
            }
        }
    }

    pub async fn execute_tool(
        &self,
        tool_name: &str,
        arguments: Map<String, Value>,
        options: ExecuteOptions,
    ) -> ExecuteResult {
        for filter in &self.filters {
            if !filter(tool_name, &arguments) {
                return ExecuteResult {
                    success: false,
                    result: None,
                    error_message: Some(ToolFleetError::DeniedByFilter(tool_name.to_string()).to_string()),
                    server_name: None,
                    execution_time_ms: 0,
                    tool_name: tool_name.to_string(),
                };
            }
        }

        let key = cache_key(tool_name, options.server_name.as_deref(), &arguments);
        if options.use_cache {
            if let Some(entry) = self.cache.get(&key) {
                if !entry.is_expired() {
                    return ExecuteResult {
                        success: true,
                        result: Some(entry.result.clone()),
                        error_message: None,
                        server_name: Some(entry.server_name.clone()),
                        execution_time_ms: 0,
                        tool_name: tool_name.to_string(),
                    };
                }
            }
        }

        let candidates = self
            .healthy_candidates(tool_name, options.server_name.as_deref())
            .await;
        if candidates.is_empty() {
            return ExecuteResult {
                success: false,
                result: None,
                error_message: Some(ToolFleetError::NoServer(tool_name.to_string()).to_string()),
                server_name: None,
                execution_time_ms: 0,
                tool_name: tool_name.to_string(),
            };
        }

        let server_name = self.select(tool_name, &candidates);
        let Some(client) = self.registry.client(&server_name) else {
            return ExecuteResult {
                success: false,
                result: None,
                error_message: Some(ToolFleetError::ServerNotFound(server_name).to_string()),
                server_name: None,
                execution_time_ms: 0,
                tool_name: tool_name.to_string(),
            };
        };

        let timeout = options.timeout.unwrap_or(Duration::from_secs(30));
        let started = Instant::now();
        let call_result = client.call_tool(tool_name, Some(arguments), timeout).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        self.catalog.record_tool_usage(tool_name, elapsed_ms);

        match call_result {
            Ok(result) => {
                let value = serde_json::to_value(&result).unwrap_or(Value::Null);
                if options.use_cache {
                    self.maybe_evict();
                    self.cache.insert(
                        key,
                        CacheEntry {
                            result: value.clone(),
                            server_name: server_name.clone(),
                            inserted_at: Instant::now(),
                            ttl: options.cache_ttl.unwrap_or(DEFAULT_CACHE_TTL),
                        },
                    );
                }
                ExecuteResult {
                    success: true,
                    result: Some(value),
                    error_message: None,
                    server_name: Some(server_name),
                    execution_time_ms: elapsed_ms,
                    tool_name: tool_name.to_string(),
                }
            }
            Err(e) => ExecuteResult {
                success: false,
                result: None,
                error_message: Some(e.to_string()),
                server_name: Some(server_name),
                execution_time_ms: elapsed_ms,
                tool_name: tool_name.to_string(),
            },
        }
    }

    /// Evicts expired entries once the cache grows past the size threshold;
    /// runs opportunistically rather than on a timer.
    fn maybe_evict(&self) {
        if self.cache.len() <= CACHE_EVICTION_THRESHOLD {
            return;
        }
        let before = self.cache.len();
        self.cache.retain(|_, entry| !entry.is_expired());
        if self.cache.len() < before {
            warn!(evicted = before - self.cache.len(), "evicted expired cache entries");
        }
    }

    pub async fn execute_batch(
        &self,
        requests: Vec<ExecuteRequest>,
        parallel: bool,
        max_concurrent: usize,
    ) -> Vec<ExecuteResult> {
        if !parallel {
            let mut results = Vec::with_capacity(requests.len());
            for req in requests {
                results.push(self.execute_tool(&req.tool_name, req.arguments, req.options).await);
            }
            return results;
        }

        let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
        let mut handles = Vec::with_capacity(requests.len());
        for req in requests {
            let semaphore = Arc::clone(&semaphore);
            // SAFETY-free: `self` outlives every spawned task because the
            // caller awaits this function to completion before dropping it.
            let invoker: &ToolInvoker = self;
            handles.push(async move {
                let _permit = semaphore.acquire().await.expect("semaphore not closed");
                invoker.execute_tool(&req.tool_name, req.arguments, req.options).await
            });
        }
        futures::future::join_all(handles).await
    }

    pub async fn get_resource(&self, uri: &str) -> ToolFleetResult<Value> {
        let owner = self
            .catalog
            .all_resources()
            .into_iter()
            .find(|r| r.uri == uri)
            .map(|r| r.server_name)
            .ok_or_else(|| ToolFleetError::ResourceNotFound(uri.to_string()))?;

        let client = self
            .registry
            .client(&owner)
            .ok_or_else(|| ToolFleetError::ServerNotFound(owner.clone()))?;

        let result = client.get_resource(uri).await?;
        Ok(serde_json::to_value(result).unwrap_or(Value::Null))
    }

    pub async fn get_prompt(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
        server_override: Option<&str>,
    ) -> ToolFleetResult<Value> {
        let owner = match server_override {
            Some(s) => s.to_string(),
            None => self
                .catalog
                .all_prompts()
                .into_iter()
                .find(|p| p.name == name)
                .map(|p| p.server_name)
                .ok_or_else(|| ToolFleetError::PromptNotFound(name.to_string()))?,
        };

        let client = self
            .registry
            .client(&owner)
            .ok_or_else(|| ToolFleetError::ServerNotFound(owner.clone()))?;

        let result = client.get_prompt(name, arguments).await?;
        Ok(serde_json::to_value(result).unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_stable_under_argument_insertion_order() {
        let mut a = Map::new();
        a.insert("x".into(), Value::from(1));
        a.insert("y".into(), Value::from(2));

        let mut b = Map::new();
        b.insert("y".into(), Value::from(2));
        b.insert("x".into(), Value::from(1));

        assert_eq!(cache_key("add", None, &a), cache_key("add", None, &b));
    }

    #[test]
    fn cache_key_differs_on_server_hint() {
        let args = Map::new();
        assert_ne!(
            cache_key("add", Some("brave"), &args),
            cache_key("add", Some("google"), &args)
        );
    }

    #[test]
    fn round_robin_cycles_counter_modulo_candidate_count() {
        let registry = Arc::new(ServerRegistry::new());
        let catalog = Arc::new(Catalog::new());
        let invoker = ToolInvoker::new(registry, catalog, ExecutionStrategy::RoundRobin);
        let candidates = vec!["a".to_string(), "b".to_string()];
        let picks: Vec<String> = (0..4).map(|_| invoker.select("add", &candidates)).collect();
        assert_eq!(picks, vec!["a", "b", "a", "b"]);
    }

    #[test]
    fn least_used_reads_the_requested_tools_own_usage_count() {
        let registry = Arc::new(ServerRegistry::new());
        let catalog = Arc::new(Catalog::new());

        // "a" offers "add" (heavily used) plus a decoy tool with a low count;
        // naively matching the first tool belonging to "a" would make "a"
        // look least-used even though "add" itself is not.
        let mut add_on_a = crate::catalog::ToolEntry::new("add", "a", None, Map::new());
        add_on_a.usage_count = 50;
        catalog.insert_tool(add_on_a);
        let mut decoy = crate::catalog::ToolEntry::new("decoy", "a", None, Map::new());
        decoy.usage_count = 0;
        catalog.insert_tool(decoy);

        let mut add_on_b = crate::catalog::ToolEntry::new("add", "b", None, Map::new());
        add_on_b.usage_count = 1;
        catalog.insert_tool(add_on_b);

        let invoker = ToolInvoker::new(registry, catalog, ExecutionStrategy::LeastUsed);
        let candidates = vec!["a".to_string(), "b".to_string()];
        assert_eq!(invoker.select("add", &candidates), "b");
    }
}
