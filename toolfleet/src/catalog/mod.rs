//! Unified capability catalog (C3).

pub mod index;
pub mod types;

pub use index::{Catalog, CapabilitySummary, ToolUsageStat, DISCOVERY_CACHE_TTL};
pub use types::{AvailabilityStatus, CatalogKey, PromptArgument, PromptEntry, ResourceEntry, ToolEntry};
