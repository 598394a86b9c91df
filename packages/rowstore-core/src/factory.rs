//! Table construction.
//!
//! Every table is built here so that the common wiring (column names,
//! storage sized to the schema, index stats tags) happens the same way for
//! every variant.

use std::sync::Arc;

use crate::context::{CatalogId, ExecutorContext};
use crate::index::{TableIndex, TableIndexScheme};
use crate::schema::TupleSchema;
use crate::stats::TableStats;
use crate::storage::{ObjectPool, TupleStorage};
use crate::table::{
    PersistentTable, StreamedTable, Table, TableVariant, TempTable, TempTableLimits,
};

/// Builds persistent, streamed and temp tables.
pub struct TableFactory;

impl TableFactory {
    /// Creates a persistent table, or a streamed table when `export_only`.
    ///
    /// The primary key index, when given, becomes the table's first index and
    /// one of its unique indexes. Streamed tables keep no indexes.
    ///
    /// # Panics
    /// Panics if the column names do not match the schema or an index names a
    /// column past the end of the schema.
    #[allow(clippy::too_many_arguments)]
    pub fn get_persistent_table(
        database_id: CatalogId,
        ctx: &ExecutorContext,
        name: &str,
        schema: TupleSchema,
        column_names: Vec<String>,
        pkey_index: Option<TableIndexScheme>,
        indexes: Vec<TableIndexScheme>,
        partition_column: Option<usize>,
        export_enabled: bool,
        export_only: bool,
    ) -> Table {
        let mut table = if export_only {
            Self::new_table(
                database_id,
                name,
                Arc::new(schema),
                true,
                TableVariant::Streamed(StreamedTable::default()),
            )
        } else {
            let mut table = Self::new_table(
                database_id,
                name,
                Arc::new(schema),
                true,
                TableVariant::Persistent(PersistentTable::new(partition_column, export_enabled)),
            );
            if let Some(mut pkey) = pkey_index {
                // A primary key is unique whatever its scheme says.
                pkey.unique = true;
                Self::add_index(&mut table, pkey);
                table.has_primary_key = true;
            }
            for scheme in indexes {
                Self::add_index(&mut table, scheme);
            }
            table
        };

        Self::init_common(&mut table, column_names);
        Self::configure_stats(ctx, name, &mut table);
        tracing::debug!(
            "Created {} '{}' with {} columns and {} indexes",
            table.table_type(),
            name,
            table.column_count(),
            table.index_count()
        );
        table
    }

    /// Creates a temp table charged against `limits`.
    pub fn get_temp_table(
        database_id: CatalogId,
        name: &str,
        schema: TupleSchema,
        column_names: Vec<String>,
        limits: Option<Arc<TempTableLimits>>,
    ) -> Table {
        let mut table = Self::new_table(
            database_id,
            name,
            Arc::new(schema),
            true,
            TableVariant::Temp(TempTable::new(limits)),
        );
        Self::init_common(&mut table, column_names);
        table
    }

    /// Creates an empty temp table with the same columns as `template`.
    ///
    /// The schema is shared with the template, not copied, and the new table
    /// does not own it.
    pub fn get_copied_temp_table(
        database_id: CatalogId,
        name: &str,
        template: &Table,
        limits: Option<Arc<TempTableLimits>>,
    ) -> Table {
        let mut table = Self::new_table(
            database_id,
            name,
            Arc::clone(template.schema_handle()),
            false,
            TableVariant::Temp(TempTable::new(limits)),
        );
        Self::init_common(&mut table, template.column_names().to_vec());
        table
    }

    /// Installs column names and sizes storage to the schema.
    ///
    /// # Panics
    /// Panics if there are no column names or their count differs from the
    /// schema's column count.
    pub fn init_common(table: &mut Table, column_names: Vec<String>) {
        assert!(!column_names.is_empty(), "table needs at least one column name");
        assert_eq!(
            column_names.len(),
            table.schema.column_count(),
            "column name count must match schema column count"
        );
        table.column_names = column_names;
        table.storage = TupleStorage::new(table.schema.tuple_length());
    }

    /// Tags table and index stats with the site identity.
    pub fn configure_stats(ctx: &ExecutorContext, name: &str, table: &mut Table) {
        let database_id = table.database_id;
        table.stats.configure(name, ctx, database_id);
        for index in &mut table.indexes {
            let index_name = index.name().to_string();
            index.stats_mut().configure(&index_name, name, ctx, database_id);
        }
    }

    fn new_table(
        database_id: CatalogId,
        name: &str,
        schema: Arc<TupleSchema>,
        owns_schema: bool,
        variant: TableVariant,
    ) -> Table {
        let storage = TupleStorage::new(schema.tuple_length());
        Table {
            database_id,
            name: name.to_string(),
            schema,
            owns_schema,
            column_names: Vec::new(),
            storage,
            objects: ObjectPool::new(),
            indexes: Vec::new(),
            unique_indexes: Vec::new(),
            has_primary_key: false,
            stats: TableStats::default(),
            variant,
        }
    }

    fn add_index(table: &mut Table, scheme: TableIndexScheme) {
        let column_count = table.schema.column_count();
        assert!(!scheme.columns.is_empty(), "index '{}' has no columns", scheme.name);
        for &column in &scheme.columns {
            assert!(
                column < column_count,
                "index '{}' column {} out of range ({} columns)",
                scheme.name,
                column,
                column_count
            );
        }
        if scheme.unique {
            table.unique_indexes.push(table.indexes.len());
        }
        table.indexes.push(TableIndex::new(scheme));
    }
}
