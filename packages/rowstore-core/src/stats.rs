//! Statistics identity for tables and indexes.
//!
//! Only the naming tuple lives here. Collection and reporting belong to the
//! registry the tags are handed to.

use crate::context::{CatalogId, ExecutorContext};

/// Identifying tuple of a stats source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsTags {
    /// Stats source name, e.g. `"orders stats"`
    pub name: String,
    /// Owning table for index stats
    pub table_name: Option<String>,
    pub host_id: i32,
    pub hostname: String,
    pub site_id: i64,
    pub partition_id: i32,
    pub database_id: CatalogId,
}

impl StatsTags {
    fn new(
        name: String,
        table_name: Option<String>,
        ctx: &ExecutorContext,
        database_id: CatalogId,
    ) -> Self {
        Self {
            name,
            table_name,
            host_id: ctx.host_id,
            hostname: ctx.hostname.clone(),
            site_id: ctx.site_id,
            partition_id: ctx.partition_id,
            database_id,
        }
    }
}

/// Receiver of stats registrations.
pub trait StatsRegistry: Send + Sync {
    fn register_table_stats(&self, tags: &StatsTags);
    fn register_index_stats(&self, tags: &StatsTags);
}

/// Stats handle of a table.
#[derive(Debug, Default, Clone)]
pub struct TableStats {
    tags: Option<StatsTags>,
}

impl TableStats {
    /// Tags the table stats as `"<table_name> stats"`.
    pub fn configure(&mut self, table_name: &str, ctx: &ExecutorContext, database_id: CatalogId) {
        let tags = StatsTags::new(format!("{} stats", table_name), None, ctx, database_id);
        if let Some(registry) = ctx.stats_registry() {
            registry.register_table_stats(&tags);
        }
        self.tags = Some(tags);
    }

    pub fn tags(&self) -> Option<&StatsTags> {
        self.tags.as_ref()
    }

    pub fn is_configured(&self) -> bool {
        self.tags.is_some()
    }
}

/// Stats handle of an index.
#[derive(Debug, Default, Clone)]
pub struct IndexStats {
    tags: Option<StatsTags>,
}

impl IndexStats {
    /// Tags the index stats as `"<index_name> stats"` under `table_name`.
    pub fn configure(
        &mut self,
        index_name: &str,
        table_name: &str,
        ctx: &ExecutorContext,
        database_id: CatalogId,
    ) {
        let tags = StatsTags::new(
            format!("{} stats", index_name),
            Some(table_name.to_string()),
            ctx,
            database_id,
        );
        if let Some(registry) = ctx.stats_registry() {
            registry.register_index_stats(&tags);
        }
        self.tags = Some(tags);
    }

    pub fn tags(&self) -> Option<&StatsTags> {
        self.tags.as_ref()
    }

    pub fn is_configured(&self) -> bool {
        self.tags.is_some()
    }
}
