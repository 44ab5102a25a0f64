//! Catalog entry types shared by the tool, resource, and prompt indices.

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Availability of a catalog entry, tracked independently of the owning
/// server's connection status (a connected server can still report a
/// specific tool as erroring).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityStatus {
    Available,
    Unavailable,
    Error,
    #[default]
    Unknown,
}

/// The name a catalog entry is stored under. The *second* server to publish
/// a given simple name has its entry qualified as `server.name`; the first
/// keeps the bare name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogKey(pub String);

impl CatalogKey {
    pub fn qualified(server_name: &str, name: &str) -> Self {
        Self(format!("{server_name}.{name}"))
    }

    pub fn bare(name: &str) -> Self {
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct ToolEntry {
    pub name: String,
    pub server_name: String,
    pub description: Option<String>,
    pub input_schema: serde_json::Map<String, serde_json::Value>,
    pub availability_status: AvailabilityStatus,
    pub usage_count: u64,
    pub last_used: Option<Instant>,
    /// Last-observed call latency — not a moving average (see resolved open
    /// question in the design notes).
    pub response_time_ms: Option<u64>,
    pub last_checked: Instant,
    pub error_message: Option<String>,
}

impl ToolEntry {
    pub fn new(
        name: impl Into<String>,
        server_name: impl Into<String>,
        description: Option<String>,
        input_schema: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            name: name.into(),
            server_name: server_name.into(),
            description,
            input_schema,
            availability_status: AvailabilityStatus::Available,
            usage_count: 0,
            last_used: None,
            response_time_ms: None,
            last_checked: Instant::now(),
            error_message: None,
        }
    }

    pub fn record_usage(&mut self, elapsed_ms: u64) {
        self.usage_count += 1;
        self.last_used = Some(Instant::now());
        self.response_time_ms = Some(elapsed_ms);
    }
}

#[derive(Debug, Clone)]
pub struct ResourceEntry {
    pub uri: String,
    pub server_name: String,
    pub name: String,
    pub description: Option<String>,
    pub mime_type: Option<String>,
    pub availability_status: AvailabilityStatus,
    pub access_count: u64,
}

impl ResourceEntry {
    pub fn new(
        uri: impl Into<String>,
        server_name: impl Into<String>,
        name: impl Into<String>,
        description: Option<String>,
        mime_type: Option<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            server_name: server_name.into(),
            name: name.into(),
            description,
            mime_type,
            availability_status: AvailabilityStatus::Available,
            access_count: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PromptArgument {
    pub name: String,
    pub description: Option<String>,
    pub required: bool,
}

#[derive(Debug, Clone)]
pub struct PromptEntry {
    pub name: String,
    pub server_name: String,
    pub description: Option<String>,
    pub arguments: Vec<PromptArgument>,
}

impl PromptEntry {
    pub fn new(
        name: impl Into<String>,
        server_name: impl Into<String>,
        description: Option<String>,
        arguments: Vec<PromptArgument>,
    ) -> Self {
        Self {
            name: name.into(),
            server_name: server_name.into(),
            description,
            arguments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_key_uses_dotted_form() {
        let key = CatalogKey::qualified("brave", "search");
        assert_eq!(key.as_str(), "brave.search");
    }

    #[test]
    fn record_usage_updates_last_value_not_average() {
        let mut entry = ToolEntry::new("search", "brave", None, serde_json::Map::new());
        entry.record_usage(120);
        entry.record_usage(40);
        assert_eq!(entry.usage_count, 2);
        assert_eq!(entry.response_time_ms, Some(40));
    }
}
