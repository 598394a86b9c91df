//! Execution-site identity used to tag statistics.

use std::fmt;
use std::sync::Arc;

use crate::stats::StatsRegistry;

/// Catalog identifier of a database.
pub type CatalogId = i32;

/// Identity of the execution site a table lives on.
#[derive(Clone)]
pub struct ExecutorContext {
    /// Host identifier
    pub host_id: i32,
    /// Host name
    pub hostname: String,
    /// Site identifier
    pub site_id: i64,
    /// Partition identifier
    pub partition_id: i32,
    stats_registry: Option<Arc<dyn StatsRegistry>>,
}

impl ExecutorContext {
    pub fn new(host_id: i32, hostname: impl Into<String>, site_id: i64, partition_id: i32) -> Self {
        Self {
            host_id,
            hostname: hostname.into(),
            site_id,
            partition_id,
            stats_registry: None,
        }
    }

    /// Attaches the registry that receives stats registrations.
    pub fn with_stats_registry(mut self, registry: Arc<dyn StatsRegistry>) -> Self {
        self.stats_registry = Some(registry);
        self
    }

    pub fn stats_registry(&self) -> Option<&Arc<dyn StatsRegistry>> {
        self.stats_registry.as_ref()
    }
}

impl Default for ExecutorContext {
    fn default() -> Self {
        Self::new(0, "localhost", 0, 0)
    }
}

impl fmt::Debug for ExecutorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorContext")
            .field("host_id", &self.host_id)
            .field("hostname", &self.hostname)
            .field("site_id", &self.site_id)
            .field("partition_id", &self.partition_id)
            .field("stats_registry", &self.stats_registry.is_some())
            .finish()
    }
}
