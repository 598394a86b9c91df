//! Table storage, index maintenance and row mutation.
//!
//! Each table has:
//! - A shared, immutable tuple schema and its column names
//! - Block storage for rows and a pool for out-of-line payloads
//! - Indexes, primary key first, kept consistent with every mutation
//! - A variant: persistent, temp or streamed

use std::sync::Arc;

use crate::context::CatalogId;
use crate::error::DbError;
use crate::index::{IndexKey, TableIndex};
use crate::schema::TupleSchema;
use crate::stats::TableStats;
use crate::storage::{ObjectPool, RowId, TupleStorage};
use crate::tuple::{leading_object_handles, object_handles, write_column, TupleRef};
use crate::types::Value;

use super::export::{ExportBatch, ExportOp};
use super::variant::TableVariant;

/// Relational table.
///
/// Built only by [`crate::factory::TableFactory`].
#[derive(Debug)]
pub struct Table {
    pub(crate) database_id: CatalogId,
    pub(crate) name: String,
    pub(crate) schema: Arc<TupleSchema>,
    pub(crate) owns_schema: bool,
    pub(crate) column_names: Vec<String>,
    pub(crate) storage: TupleStorage,
    pub(crate) objects: ObjectPool,
    /// Primary key (when present) first, then secondary indexes
    pub(crate) indexes: Vec<TableIndex>,
    /// Positions in `indexes` of the unique indexes
    pub(crate) unique_indexes: Vec<usize>,
    pub(crate) has_primary_key: bool,
    pub(crate) stats: TableStats,
    pub(crate) variant: TableVariant,
}

impl Table {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn database_id(&self) -> CatalogId {
        self.database_id
    }

    pub fn schema(&self) -> &TupleSchema {
        &self.schema
    }

    /// Shared handle to the schema.
    pub fn schema_handle(&self) -> &Arc<TupleSchema> {
        &self.schema
    }

    /// Whether this table owns its schema (copied temp tables do not).
    pub fn owns_tuple_schema(&self) -> bool {
        self.owns_schema
    }

    pub fn column_count(&self) -> usize {
        self.column_names.len()
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn column_name(&self, index: usize) -> Option<&str> {
        self.column_names.get(index).map(String::as_str)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_names.iter().position(|n| n == name)
    }

    pub fn variant(&self) -> &TableVariant {
        &self.variant
    }

    pub fn table_type(&self) -> &'static str {
        self.variant.type_name()
    }

    pub fn is_streamed(&self) -> bool {
        matches!(self.variant, TableVariant::Streamed(_))
    }

    /// Partition column of a persistent table.
    pub fn partition_column(&self) -> Option<usize> {
        match &self.variant {
            TableVariant::Persistent(p) => p.partition_column,
            _ => None,
        }
    }

    pub fn indexes(&self) -> &[TableIndex] {
        &self.indexes
    }

    pub fn index_count(&self) -> usize {
        self.indexes.len()
    }

    pub fn unique_indexes(&self) -> impl Iterator<Item = &TableIndex> + '_ {
        self.unique_indexes.iter().map(|&i| &self.indexes[i])
    }

    pub fn unique_index_count(&self) -> usize {
        self.unique_indexes.len()
    }

    pub fn primary_key_index(&self) -> Option<&TableIndex> {
        if self.has_primary_key {
            self.indexes.first()
        } else {
            None
        }
    }

    pub fn index(&self, name: &str) -> Option<&TableIndex> {
        self.indexes.iter().find(|i| i.name() == name)
    }

    pub fn stats(&self) -> &TableStats {
        &self.stats
    }

    pub fn active_tuple_count(&self) -> usize {
        self.storage.active_count()
    }

    /// Bytes held by tuple blocks.
    pub fn allocated_tuple_memory(&self) -> usize {
        self.storage.allocated_bytes()
    }

    /// Bytes held by out-of-line payloads.
    pub fn non_inlined_memory(&self) -> usize {
        self.objects.allocated_bytes()
    }

    /// View of an active row.
    pub fn tuple(&self, row: RowId) -> Option<TupleRef<'_>> {
        self.storage
            .tuple(row)
            .map(|data| TupleRef::new(&self.schema, data, &self.objects, row))
    }

    /// Inserts a row.
    ///
    /// Values are coerced to the column types. Every unique index is checked
    /// before anything is written, so a rejected row leaves the table and its
    /// indexes untouched.
    ///
    /// # Returns
    /// `Result<Option<RowId>, DbError>` with the new row, or `None` for a
    /// streamed table, which forwards the row to its export stream.
    pub fn insert_values(&mut self, values: &[Value]) -> Result<Option<RowId>, DbError> {
        let prepared = self.prepare_values(values)?;
        self.insert_prepared(&prepared)
    }

    /// Inserts a copy of a row from any table with a compatible schema.
    ///
    /// Out-of-line payloads from another table are copied into this table's pool.
    pub fn insert_tuple(&mut self, tuple: &TupleRef<'_>) -> Result<Option<RowId>, DbError> {
        self.insert_values(&tuple.values())
    }

    pub(crate) fn insert_prepared(&mut self, values: &[Value]) -> Result<Option<RowId>, DbError> {
        if let TableVariant::Streamed(streamed) = &mut self.variant {
            streamed.stream.append(&self.schema, ExportOp::Insert, values)?;
            tracing::trace!("Forwarded row to export stream of '{}'", self.name);
            return Ok(None);
        }

        let keys = self.check_unique(values, None)?;
        let new_block = self.storage.needs_new_block();
        let object_bytes = self.charge_for_row(values, new_block)?;

        let row = match self.storage.allocate() {
            Ok(row) => row,
            Err(err) => {
                let block_bytes = if new_block { self.storage.block_bytes() } else { 0 };
                self.refund(object_bytes + block_bytes);
                return Err(err);
            }
        };
        if let Err(err) = self.write_row(row, values) {
            // The block stays allocated, so its charge stays too.
            self.storage.free(row);
            self.refund(object_bytes);
            return Err(err);
        }
        if let Err(err) = self.add_index_entries(row, keys) {
            self.release_row(row);
            return Err(err);
        }
        self.export(ExportOp::Insert, values)?;

        tracing::trace!("Inserted row {} into '{}'", row.index(), self.name);
        Ok(Some(row))
    }

    /// Replaces the values of an active row.
    ///
    /// A unique key conflict with another row leaves the row and all indexes
    /// unchanged.
    pub fn update_tuple(&mut self, row: RowId, values: &[Value]) -> Result<(), DbError> {
        self.require_stored_rows("update")?;
        let prepared = self.prepare_values(values)?;
        let (old_keys, old_values) = {
            let tuple = self.tuple(row).ok_or_else(|| DbError::RowNotFound {
                table: self.name.clone(),
                row: row.index(),
            })?;
            let keys: Vec<IndexKey> = self.indexes.iter().map(|i| i.key_from_tuple(&tuple)).collect();
            (keys, tuple.values())
        };
        let new_keys = self.check_unique(&prepared, Some(row))?;
        let object_bytes = self.charge_for_row(&prepared, false)?;

        let old_handles = self
            .storage
            .tuple(row)
            .map(|data| object_handles(&self.schema, data))
            .unwrap_or_default();
        if let Err(err) = self.write_row(row, &prepared) {
            self.refund(object_bytes);
            return Err(err);
        }
        self.release_objects(&old_handles);

        for ((index, old), new) in self.indexes.iter_mut().zip(old_keys).zip(new_keys) {
            if old != new {
                index.delete_entry(&old, row);
                index.add_entry(new, row, &self.name)?;
            }
        }

        self.export(ExportOp::Delete, &old_values)?;
        self.export(ExportOp::Insert, &prepared)?;
        Ok(())
    }

    /// Deletes an active row and its index entries.
    pub fn delete_tuple(&mut self, row: RowId) -> Result<(), DbError> {
        self.require_stored_rows("delete")?;
        let values = self
            .tuple(row)
            .map(|t| t.values())
            .ok_or_else(|| DbError::RowNotFound {
                table: self.name.clone(),
                row: row.index(),
            })?;
        self.release_row(row);
        self.export(ExportOp::Delete, &values)?;
        Ok(())
    }

    /// Deletes every row. Storage blocks are kept for reuse unless
    /// `free_allocated` is set.
    pub fn delete_all_tuples(&mut self, free_allocated: bool) {
        let released_blocks = if free_allocated {
            self.storage.allocated_bytes()
        } else {
            0
        };
        let released_objects = self.objects.allocated_bytes();
        for index in &mut self.indexes {
            index.clear();
        }
        self.objects.clear();
        self.storage.clear(free_allocated);
        if let TableVariant::Temp(temp) = &mut self.variant {
            temp.refund(released_blocks + released_objects);
        }
    }

    /// Hands out the pending export records, if this table exports.
    pub fn drain_export(&mut self) -> Option<ExportBatch> {
        match &mut self.variant {
            TableVariant::Streamed(s) => Some(s.stream.drain()),
            TableVariant::Persistent(p) => p.export.as_mut().map(|s| s.drain()),
            TableVariant::Temp(_) => None,
        }
    }

    /// Validates a full row and coerces it to the column types.
    pub(crate) fn prepare_values(&self, values: &[Value]) -> Result<Vec<Value>, DbError> {
        if values.len() != self.schema.column_count() {
            return Err(DbError::TypeMismatch {
                expected: format!("{} values", self.schema.column_count()),
                got: format!("{} values", values.len()),
            });
        }
        values
            .iter()
            .zip(self.schema.columns())
            .enumerate()
            .map(|(i, (value, column))| {
                let column_name = || self.column_names.get(i).cloned().unwrap_or_default();
                let coerced = value.coerce_to(column.value_type)?;
                if coerced.is_null() {
                    if !column.allow_null {
                        return Err(DbError::NullViolation {
                            table: self.name.clone(),
                            column: column_name(),
                        });
                    }
                    return Ok(coerced);
                }
                if coerced.collides_with_null_sentinel() {
                    return Err(DbError::ValueOutOfRange(format!(
                        "{} is reserved for NULL in column '{}'",
                        coerced,
                        column_name()
                    )));
                }
                if let Some(object) = coerced.object() {
                    if object.len() > column.declared_size {
                        return Err(DbError::ValueTooLong {
                            column: column_name(),
                            length: object.len(),
                            max: column.declared_size,
                        });
                    }
                }
                Ok(coerced)
            })
            .collect()
    }

    /// Computes every index key and rejects keys already held by another row.
    fn check_unique(&self, values: &[Value], updating: Option<RowId>) -> Result<Vec<IndexKey>, DbError> {
        let keys: Vec<IndexKey> = self.indexes.iter().map(|i| i.key_from_values(values)).collect();
        for &position in &self.unique_indexes {
            let index = &self.indexes[position];
            let key = &keys[position];
            let conflict = index
                .rows_for_key(key)
                .iter()
                .any(|holder| Some(*holder) != updating);
            if conflict {
                return Err(DbError::UniqueViolation {
                    table: self.name.clone(),
                    index: index.name().to_string(),
                    key: key.to_string(),
                });
            }
        }
        Ok(keys)
    }

    fn add_index_entries(&mut self, row: RowId, keys: Vec<IndexKey>) -> Result<(), DbError> {
        let mut added = Vec::with_capacity(keys.len());
        for (position, key) in keys.into_iter().enumerate() {
            let index = &mut self.indexes[position];
            match index.add_entry(key.clone(), row, &self.name) {
                Ok(()) => added.push((position, key)),
                Err(err) => {
                    for (position, key) in added {
                        self.indexes[position].delete_entry(&key, row);
                    }
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// Writes every column of `row` or none of them.
    ///
    /// Payloads stored before a failing column are released again. Their
    /// charge is left for the caller to refund.
    fn write_row(&mut self, row: RowId, values: &[Value]) -> Result<(), DbError> {
        if !self.storage.is_active(row) {
            return Err(DbError::RowNotFound {
                table: self.name.clone(),
                row: row.index(),
            });
        }
        let mut scratch = vec![0u8; self.schema.tuple_length()];
        for (i, value) in values.iter().enumerate() {
            if let Err(err) = write_column(&self.schema, &mut scratch, &mut self.objects, i, value) {
                for handle in leading_object_handles(&self.schema, &scratch, i) {
                    self.objects.release(handle);
                }
                return Err(err);
            }
        }
        if let Some(data) = self.storage.tuple_mut(row) {
            data.copy_from_slice(&scratch);
        }
        Ok(())
    }

    /// Removes a row's index entries and payloads and frees its slot.
    pub(crate) fn release_row(&mut self, row: RowId) {
        let (keys, handles) = match self.tuple(row) {
            Some(tuple) => (
                self.indexes
                    .iter()
                    .map(|i| i.key_from_tuple(&tuple))
                    .collect::<Vec<_>>(),
                object_handles(&self.schema, tuple.raw_data()),
            ),
            None => return,
        };
        for (index, key) in self.indexes.iter_mut().zip(keys) {
            index.delete_entry(&key, row);
        }
        self.release_objects(&handles);
        self.storage.free(row);
    }

    fn release_objects(&mut self, handles: &[u32]) {
        let released: usize = handles.iter().map(|&h| self.objects.release(h)).sum();
        self.refund(released);
    }

    fn refund(&mut self, bytes: usize) {
        if let TableVariant::Temp(temp) = &mut self.variant {
            temp.refund(bytes);
        }
    }

    /// Charges temp table limits for a row about to be written.
    ///
    /// # Returns
    /// The out-of-line payload bytes charged, not counting a new block.
    fn charge_for_row(&mut self, values: &[Value], new_block: bool) -> Result<usize, DbError> {
        let TableVariant::Temp(temp) = &mut self.variant else {
            return Ok(0);
        };
        let object_bytes: usize = values
            .iter()
            .zip(self.schema.columns())
            .filter(|(_, column)| !column.inlined)
            .filter_map(|(value, _)| value.object().map(|o| o.len()))
            .sum();
        let block_bytes = if new_block { self.storage.block_bytes() } else { 0 };
        temp.charge(object_bytes + block_bytes, &self.name)?;
        Ok(object_bytes)
    }

    fn export(&mut self, op: ExportOp, values: &[Value]) -> Result<(), DbError> {
        if let TableVariant::Persistent(p) = &mut self.variant {
            if let Some(stream) = &mut p.export {
                stream.append(&self.schema, op, values)?;
            }
        }
        Ok(())
    }

    fn require_stored_rows(&self, operation: &'static str) -> Result<(), DbError> {
        if self.is_streamed() {
            return Err(DbError::UnsupportedOperation {
                table: self.name.clone(),
                operation,
            });
        }
        Ok(())
    }
}
