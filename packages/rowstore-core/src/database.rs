//! Table registry of one partition, with file snapshots.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::DbConfig;
use crate::context::{CatalogId, ExecutorContext};
use crate::error::DbError;
use crate::factory::TableFactory;
use crate::index::TableIndexScheme;
use crate::schema::TupleSchema;
use crate::serialize::io_utils::classify_io_error;
use crate::serialize::{deserialize_table, FileOutput};
use crate::table::{Table, TempTableLimits};
use crate::types::ValueType;

/// Column of a [`TableDefinition`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    pub value_type: ValueType,
    /// Declared size; 0 means the natural width for fixed-width types
    #[serde(default)]
    pub size: usize,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

/// Catalog description of a persistent table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
    #[serde(default)]
    pub primary_key: Option<TableIndexScheme>,
    #[serde(default)]
    pub indexes: Vec<TableIndexScheme>,
    #[serde(default)]
    pub partition_column: Option<usize>,
    #[serde(default)]
    pub export_enabled: bool,
    #[serde(default)]
    pub export_only: bool,
}

impl TableDefinition {
    /// Builds the tuple schema, inlining short variable-length columns.
    pub fn to_schema(&self) -> Result<TupleSchema, DbError> {
        let types: Vec<ValueType> = self.columns.iter().map(|c| c.value_type).collect();
        let sizes: Vec<usize> = self.columns.iter().map(|c| c.size).collect();
        let nullable: Vec<bool> = self.columns.iter().map(|c| c.nullable).collect();
        TupleSchema::build(&types, &sizes, &nullable)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    fn validate(&self) -> Result<(), DbError> {
        if self.columns.is_empty() {
            return Err(DbError::InvalidSchema(format!(
                "table '{}' has no columns",
                self.name
            )));
        }
        let count = self.columns.len();
        let index_columns = self
            .primary_key
            .iter()
            .chain(&self.indexes)
            .flat_map(|scheme| scheme.columns.iter().copied());
        for column in index_columns.chain(self.partition_column) {
            if column >= count {
                return Err(DbError::ColumnOutOfRange {
                    table: self.name.clone(),
                    column,
                    count,
                });
            }
        }
        Ok(())
    }
}

/// Table lookup by name, as needed by plan execution.
pub trait TableCatalog {
    fn table(&self, name: &str) -> Option<&Table>;
}

/// Tables of one partition.
///
/// A partition executes serially, so the registry is owned by its single
/// executor thread and needs no locks.
#[derive(Debug)]
pub struct Database {
    database_id: CatalogId,
    context: ExecutorContext,
    config: DbConfig,
    tables: HashMap<String, Table>,
    definitions: HashMap<String, TableDefinition>,
    temp_limits: Arc<TempTableLimits>,
}

impl Database {
    pub fn new(database_id: CatalogId, context: ExecutorContext, config: DbConfig) -> Self {
        let temp_limits = Arc::new(TempTableLimits::from_config(&config));
        Self {
            database_id,
            context,
            config,
            tables: HashMap::new(),
            definitions: HashMap::new(),
            temp_limits,
        }
    }

    pub fn database_id(&self) -> CatalogId {
        self.database_id
    }

    pub fn context(&self) -> &ExecutorContext {
        &self.context
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// Limits shared by the temp tables created for this partition.
    pub fn temp_table_limits(&self) -> Arc<TempTableLimits> {
        Arc::clone(&self.temp_limits)
    }

    /// Creates a persistent (or streamed) table from its definition.
    ///
    /// # Arguments
    /// * `definition` - Columns, keys and export settings
    ///
    /// # Returns
    /// `Result<(), DbError>`; `TableAlreadyExists` if the name is taken.
    pub fn create_table(&mut self, definition: TableDefinition) -> Result<(), DbError> {
        if self.tables.contains_key(&definition.name) {
            return Err(DbError::TableAlreadyExists(definition.name));
        }
        definition.validate()?;
        let schema = definition.to_schema()?;
        let table = TableFactory::get_persistent_table(
            self.database_id,
            &self.context,
            &definition.name,
            schema,
            definition.column_names(),
            definition.primary_key.clone(),
            definition.indexes.clone(),
            definition.partition_column,
            definition.export_enabled,
            definition.export_only,
        );
        self.tables.insert(definition.name.clone(), table);
        self.definitions.insert(definition.name.clone(), definition);
        Ok(())
    }

    pub fn get_table(&self, name: &str) -> Result<&Table, DbError> {
        self.tables.get(name).ok_or_else(|| DbError::TableNotFound {
            table: name.to_string(),
        })
    }

    pub fn get_table_mut(&mut self, name: &str) -> Result<&mut Table, DbError> {
        self.tables.get_mut(name).ok_or_else(|| DbError::TableNotFound {
            table: name.to_string(),
        })
    }

    pub fn definition(&self, name: &str) -> Option<&TableDefinition> {
        self.definitions.get(name)
    }

    pub fn delete_table(&mut self, name: &str) -> Result<(), DbError> {
        self.tables.remove(name).ok_or_else(|| DbError::TableNotFound {
            table: name.to_string(),
        })?;
        self.definitions.remove(name);
        Ok(())
    }

    /// Table names, sorted.
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Path of the data file written by [`snapshot_table`](Self::snapshot_table).
    pub fn snapshot_path(&self, name: &str) -> PathBuf {
        self.config.data_dir.join(format!("{}.tbl", name))
    }

    fn definition_path(&self, name: &str) -> PathBuf {
        self.config.data_dir.join(format!("{}.def.json", name))
    }

    /// Writes a table and its definition to the data directory.
    ///
    /// Both files are written under a temporary name and renamed into place.
    ///
    /// # Returns
    /// `Result<PathBuf, DbError>` with the path of the data file.
    pub fn snapshot_table(&self, name: &str) -> Result<PathBuf, DbError> {
        let table = self.get_table(name)?;
        let definition = self.definitions.get(name).ok_or_else(|| DbError::TableNotFound {
            table: name.to_string(),
        })?;
        fs::create_dir_all(&self.config.data_dir)
            .map_err(|e| classify_io_error(e, "create data directory"))?;

        let final_path = self.snapshot_path(name);
        let temp_path = final_path.with_extension("tbl.tmp");
        let mut out = FileOutput::with_buffer_size(&temp_path, self.config.io_buffer_size)?;
        table.serialize_to(&mut out)?;
        let written = out.finish()?;
        fs::rename(&temp_path, &final_path)
            .map_err(|e| classify_io_error(e, "rename table snapshot"))?;

        let json = serde_json::to_string_pretty(definition)
            .map_err(|e| DbError::IoError(format!("encode table definition: {}", e)))?;
        write_atomically(&self.definition_path(name), json.as_bytes())?;

        tracing::debug!(
            "Snapshot of '{}' written to {} ({} bytes)",
            name,
            final_path.display(),
            written
        );
        Ok(final_path)
    }

    /// Loads a table snapshot, creating the table from its saved definition
    /// when it does not exist yet.
    ///
    /// # Returns
    /// `Result<usize, DbError>` with the number of rows loaded.
    pub fn restore_table(&mut self, name: &str) -> Result<usize, DbError> {
        if !self.tables.contains_key(name) {
            let json = fs::read_to_string(self.definition_path(name))
                .map_err(|e| classify_io_error(e, "read table definition"))?;
            let definition: TableDefinition = serde_json::from_str(&json)
                .map_err(|e| DbError::Deserialization(format!("table definition: {}", e)))?;
            self.create_table(definition)?;
        }

        let path = self.snapshot_path(name);
        let table = self.get_table_mut(name)?;
        let rows = load_snapshot(table, &path)?;
        tracing::info!("Restored {} rows into '{}'", rows, name);
        Ok(rows)
    }
}

#[cfg(feature = "persist")]
fn load_snapshot(table: &mut Table, path: &Path) -> Result<usize, DbError> {
    let mapped = crate::serialize::MappedFile::open(path)?;
    let mut input = mapped.input();
    deserialize_table(table, &mut input)
}

#[cfg(not(feature = "persist"))]
fn load_snapshot(table: &mut Table, path: &Path) -> Result<usize, DbError> {
    let mut input = crate::serialize::FileInput::open(path)?;
    deserialize_table(table, &mut input)
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), DbError> {
    use std::io::Write;

    let temp_path = path.with_extension("tmp");
    let mut file =
        fs::File::create(&temp_path).map_err(|e| classify_io_error(e, "create temp file"))?;
    file.write_all(bytes)
        .map_err(|e| classify_io_error(e, "write temp file"))?;
    file.sync_all()
        .map_err(|e| classify_io_error(e, "sync temp file"))?;
    fs::rename(&temp_path, path).map_err(|e| classify_io_error(e, "rename temp file"))?;
    Ok(())
}

impl TableCatalog for Database {
    fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }
}

impl TableCatalog for HashMap<String, Table> {
    fn table(&self, name: &str) -> Option<&Table> {
        self.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexType;
    use crate::types::Value;
    use ntest::timeout;

    fn definition(name: &str) -> TableDefinition {
        TableDefinition {
            name: name.to_string(),
            columns: vec![
                ColumnDefinition {
                    name: "id".into(),
                    value_type: ValueType::Integer,
                    size: 0,
                    nullable: false,
                },
                ColumnDefinition {
                    name: "label".into(),
                    value_type: ValueType::Varchar,
                    size: 100,
                    nullable: true,
                },
            ],
            primary_key: Some(TableIndexScheme::new("pk", IndexType::BalancedTree, vec![0], true)),
            indexes: Vec::new(),
            partition_column: Some(0),
            export_enabled: false,
            export_only: false,
        }
    }

    #[timeout(1000)]
    #[test]
    fn test_create_get_delete() {
        let mut db = Database::new(1, ExecutorContext::default(), DbConfig::default());
        db.create_table(definition("b")).unwrap();
        db.create_table(definition("a")).unwrap();
        assert!(matches!(
            db.create_table(definition("a")),
            Err(DbError::TableAlreadyExists(_))
        ));

        assert_eq!(db.table_names(), vec!["a".to_string(), "b".to_string()]);
        assert!(db.get_table("a").unwrap().stats().is_configured());
        assert!(!db.get_table("a").unwrap().schema().column_is_inlined(1));
        assert!(db.table("b").is_some());

        db.delete_table("a").unwrap();
        assert_eq!(db.table_count(), 1);
        assert!(matches!(db.get_table("a"), Err(DbError::TableNotFound { .. })));
    }

    #[timeout(1000)]
    #[test]
    fn test_invalid_index_column_rejected() {
        let mut db = Database::new(1, ExecutorContext::default(), DbConfig::default());
        let mut def = definition("t");
        def.indexes
            .push(TableIndexScheme::new("ix", IndexType::Hash, vec![5], false));
        assert!(matches!(
            db.create_table(def),
            Err(DbError::ColumnOutOfRange { column: 5, .. })
        ));
        assert_eq!(db.table_count(), 0);
    }

    #[timeout(1000)]
    #[test]
    fn test_definition_json_defaults() {
        let json = r#"{
            "name": "t",
            "columns": [{"name": "id", "value_type": "INTEGER"}]
        }"#;
        let def: TableDefinition = serde_json::from_str(json).unwrap();
        assert!(def.columns[0].nullable);
        assert_eq!(def.columns[0].size, 0);
        assert!(def.primary_key.is_none());
        assert_eq!(def.to_schema().unwrap().tuple_length(), 4);
    }

    #[timeout(1000)]
    #[test]
    fn test_catalog_over_map() {
        let mut db = Database::new(1, ExecutorContext::default(), DbConfig::default());
        db.create_table(definition("t")).unwrap();
        db.get_table_mut("t")
            .unwrap()
            .insert_values(&[Value::Integer(1), Value::varchar("x")])
            .unwrap();

        let mut map = HashMap::new();
        let table = TableFactory::get_temp_table(
            1,
            "tmp",
            db.get_table("t").unwrap().schema().clone(),
            vec!["id".into(), "label".into()],
            Some(db.temp_table_limits()),
        );
        map.insert("tmp".to_string(), table);
        assert!(TableCatalog::table(&map, "tmp").is_some());
        assert!(TableCatalog::table(&map, "t").is_none());
    }
}
