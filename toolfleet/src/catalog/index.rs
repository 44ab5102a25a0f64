//! Unified capability catalog (C3): tool, resource, and prompt indices
//! merged across all registered tool servers.

use std::{collections::HashSet, time::Duration};

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::warn;

use super::types::{AvailabilityStatus, CatalogKey, PromptEntry, ResourceEntry, ToolEntry};

pub const DISCOVERY_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Default)]
pub struct CapabilitySummary {
    pub tool_count: usize,
    pub resource_count: usize,
    pub prompt_count: usize,
    pub server_count: usize,
}

#[derive(Debug, Clone)]
pub struct ToolUsageStat {
    pub name: String,
    pub usage_count: u64,
    pub response_time_ms: Option<u64>,
}

/// Thread-safe unified catalog of tools/resources/prompts across all
/// connected tool servers, keyed by a name that is qualified on collision.
pub struct Catalog {
    tools: DashMap<CatalogKey, ToolEntry>,
    tools_by_simple_name: DashMap<String, Vec<CatalogKey>>,
    resources: DashMap<String, ResourceEntry>,
    prompts: DashMap<CatalogKey, PromptEntry>,
    prompts_by_simple_name: DashMap<String, Vec<CatalogKey>>,
    keys_by_server: DashMap<String, HashSet<CatalogKey>>,
    resources_by_server: DashMap<String, HashSet<String>>,
    last_discovery_time: DashMap<String, Instant>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            tools: DashMap::new(),
            tools_by_simple_name: DashMap::new(),
            resources: DashMap::new(),
            prompts: DashMap::new(),
            prompts_by_simple_name: DashMap::new(),
            keys_by_server: DashMap::new(),
            resources_by_server: DashMap::new(),
            last_discovery_time: DashMap::new(),
        }
    }

    /// True if this server's catalog entries were refreshed within the last
    /// 5 minutes and a fresh discovery can be skipped.
    pub fn is_discovery_fresh(&self, server_name: &str) -> bool {
        self.last_discovery_time
            .get(server_name)
            .map(|t| t.elapsed() < DISCOVERY_CACHE_TTL)
            .unwrap_or(false)
    }

    pub fn mark_discovered(&self, server_name: &str) {
        self.last_discovery_time
            .insert(server_name.to_string(), Instant::now());
    }

    /// Clear every entry owned by `server_name` (tools, prompts, resources,
    /// and the side indices pointing at them) — step one of re-discovery.
    pub fn clear_server(&self, server_name: &str) {
        if let Some((_, keys)) = self.keys_by_server.remove(server_name) {
            for key in keys {
                if self.tools.remove(&key).is_some() {
                    self.tools_by_simple_name
                        .retain(|_, v| {
                            v.retain(|k| k != &key);
                            !v.is_empty()
                        });
                }
                if self.prompts.remove(&key).is_some() {
                    self.prompts_by_simple_name.retain(|_, v| {
                        v.retain(|k| k != &key);
                        !v.is_empty()
                    });
                }
            }
        }
        if let Some((_, uris)) = self.resources_by_server.remove(server_name) {
            for uri in uris {
                self.resources.remove(&uri);
            }
        }
    }

    /// Insert a tool entry. The first server to claim `name` keeps the bare
    /// key; the second and any later registration is qualified as
    /// `server.name` and a collision is logged.
    pub fn insert_tool(&self, mut entry: ToolEntry) {
        let simple = entry.name.clone();
        let server_name = entry.server_name.clone();

        let key = match self.tools_by_simple_name.get(&simple) {
            Some(existing) if !existing.is_empty() => {
                warn!(
                    tool = %simple,
                    server = %server_name,
                    existing = ?existing.iter().map(CatalogKey::as_str).collect::<Vec<_>>(),
                    "tool name collision, qualifying new registration"
                );
                entry.name = format!("{server_name}.{simple}");
                CatalogKey::qualified(&server_name, &simple)
            }
            _ => CatalogKey::bare(&simple),
        };

        self.tools_by_simple_name
            .entry(simple)
            .or_default()
            .push(key.clone());
        self.keys_by_server
            .entry(server_name)
            .or_default()
            .insert(key.clone());
        self.tools.insert(key, entry);
    }

    pub fn insert_prompt(&self, mut entry: PromptEntry) {
        let simple = entry.name.clone();
        let server_name = entry.server_name.clone();

        let key = match self.prompts_by_simple_name.get(&simple) {
            Some(existing) if !existing.is_empty() => {
                warn!(
                    prompt = %simple,
                    server = %server_name,
                    "prompt name collision, qualifying new registration"
                );
                entry.name = format!("{server_name}.{simple}");
                CatalogKey::qualified(&server_name, &simple)
            }
            _ => CatalogKey::bare(&simple),
        };

        self.prompts_by_simple_name
            .entry(simple)
            .or_default()
            .push(key.clone());
        self.keys_by_server
            .entry(server_name)
            .or_default()
            .insert(key.clone());
        self.prompts.insert(key, entry);
    }

    /// Resources key by URI, already globally unique — no qualification
    /// needed.
    pub fn insert_resource(&self, entry: ResourceEntry) {
        let uri = entry.uri.clone();
        let server_name = entry.server_name.clone();
        self.resources_by_server
            .entry(server_name)
            .or_default()
            .insert(uri.clone());
        self.resources.insert(uri, entry);
    }

    pub fn tool(&self, name: &str) -> Option<ToolEntry> {
        self.tools.get(&CatalogKey::bare(name)).map(|e| e.clone())
    }

    pub fn all_tools(&self) -> Vec<ToolEntry> {
        self.tools.iter().map(|e| e.value().clone()).collect()
    }

    pub fn all_resources(&self) -> Vec<ResourceEntry> {
        self.resources.iter().map(|e| e.value().clone()).collect()
    }

    pub fn all_prompts(&self) -> Vec<PromptEntry> {
        self.prompts.iter().map(|e| e.value().clone()).collect()
    }

    pub fn tools_for_server(&self, server_name: &str) -> Vec<ToolEntry> {
        self.tools
            .iter()
            .filter(|e| e.server_name == server_name)
            .map(|e| e.value().clone())
            .collect()
    }

    /// All servers that have registered a tool under this simple name
    /// (pre-qualification name), healthy or not.
    pub fn servers_for(&self, simple_name: &str) -> Vec<String> {
        self.tools_by_simple_name
            .get(simple_name)
            .map(|keys| {
                keys.iter()
                    .filter_map(|k| self.tools.get(k).map(|e| e.server_name.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn search_tools(&self, query: &str, case_sensitive: bool) -> Vec<ToolEntry> {
        let needle = if case_sensitive {
            query.to_string()
        } else {
            query.to_lowercase()
        };
        self.tools
            .iter()
            .filter(|e| {
                let haystack = format!(
                    "{} {}",
                    e.name,
                    e.description.as_deref().unwrap_or("")
                );
                let haystack = if case_sensitive {
                    haystack
                } else {
                    haystack.to_lowercase()
                };
                haystack.contains(&needle)
            })
            .map(|e| e.value().clone())
            .collect()
    }

    /// Increment usage accounting for a tool; last-value latency, not an
    /// average, per the execution-strategy design.
    pub fn record_tool_usage(&self, name: &str, elapsed_ms: u64) {
        if let Some(mut entry) = self.tools.get_mut(&CatalogKey::bare(name)) {
            entry.record_usage(elapsed_ms);
        }
    }

    pub fn update_tool_availability(&self, name: &str, status: AvailabilityStatus, error: Option<String>) {
        if let Some(mut entry) = self.tools.get_mut(&CatalogKey::bare(name)) {
            entry.availability_status = status;
            entry.error_message = error;
            entry.last_checked = Instant::now();
        }
    }

    pub fn capability_summary(&self) -> CapabilitySummary {
        CapabilitySummary {
            tool_count: self.tools.len(),
            resource_count: self.resources.len(),
            prompt_count: self.prompts.len(),
            server_count: self.keys_by_server.len(),
        }
    }

    pub fn usage_statistics(&self) -> Vec<ToolUsageStat> {
        self.tools
            .iter()
            .map(|e| ToolUsageStat {
                name: e.name.clone(),
                usage_count: e.usage_count,
                response_time_ms: e.response_time_ms,
            })
            .collect()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(name: &str, server: &str) -> ToolEntry {
        ToolEntry::new(name, server, Some(format!("{name} tool")), serde_json::Map::new())
    }

    #[test]
    fn second_registration_is_the_one_qualified() {
        let catalog = Catalog::new();
        catalog.insert_tool(tool("search", "brave"));
        catalog.insert_tool(tool("search", "google"));

        // First stays bare.
        let bare = catalog.tool("search").unwrap();
        assert_eq!(bare.server_name, "brave");

        // Second is qualified and reachable under its qualified name.
        let qualified = catalog.tool("google.search").unwrap();
        assert_eq!(qualified.server_name, "google");
        assert_eq!(qualified.name, "google.search");
    }

    #[test]
    fn servers_for_lists_both_sides_of_a_collision() {
        let catalog = Catalog::new();
        catalog.insert_tool(tool("search", "brave"));
        catalog.insert_tool(tool("search", "google"));
        let servers = catalog.servers_for("search");
        assert_eq!(servers.len(), 2);
        assert!(servers.contains(&"brave".to_string()));
        assert!(servers.contains(&"google".to_string()));
    }

    #[test]
    fn clear_server_removes_only_its_own_entries() {
        let catalog = Catalog::new();
        catalog.insert_tool(tool("search", "brave"));
        catalog.insert_tool(tool("search", "google"));

        catalog.clear_server("brave");

        assert!(catalog.tool("search").is_none());
        assert!(catalog.tool("google.search").is_some());
        assert_eq!(catalog.capability_summary().tool_count, 1);
    }

    #[test]
    fn search_tools_matches_name_or_description_case_insensitive() {
        let catalog = Catalog::new();
        catalog.insert_tool(tool("read_file", "fs"));
        let hits = catalog.search_tools("READ", false);
        assert_eq!(hits.len(), 1);
        assert!(catalog.search_tools("READ", true).is_empty());
    }

    #[test]
    fn discovery_cache_freshness() {
        let catalog = Catalog::new();
        assert!(!catalog.is_discovery_fresh("brave"));
        catalog.mark_discovered("brave");
        assert!(catalog.is_discovery_fresh("brave"));
    }
}
