//! Candidate-row strategies plugged into [`ScanExecutor`](super::ScanExecutor).

use std::fmt;

use tracing::trace;

use rowstore_core::error::DbError;
use rowstore_core::index::LookupType;
use rowstore_core::storage::RowId;
use rowstore_core::table::{Table, TableCursor};
use rowstore_core::types::Value;

use crate::plan::IndexScanSpec;

/// Supplies the candidate rows of one scan.
pub trait ScanStrategy: fmt::Debug {
    /// Variant-specific binding, run once at the end of executor `init`.
    fn init_more(&mut self, table: &Table) -> Result<(), DbError>;

    /// Restarts the candidate sequence for one execution.
    fn begin(&mut self, table: &Table, params: &[Value]) -> Result<(), DbError>;

    /// Next candidate row, or `None` once the source is exhausted.
    fn next_candidate(&mut self, table: &Table) -> Option<RowId>;
}

/// Every active row, in storage order.
#[derive(Debug, Default)]
pub struct SeqScan {
    cursor: TableCursor,
}

impl SeqScan {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScanStrategy for SeqScan {
    fn init_more(&mut self, _table: &Table) -> Result<(), DbError> {
        Ok(())
    }

    fn begin(&mut self, _table: &Table, _params: &[Value]) -> Result<(), DbError> {
        self.cursor.reset();
        Ok(())
    }

    fn next_candidate(&mut self, table: &Table) -> Option<RowId> {
        table.next_from(&mut self.cursor).map(|tuple| tuple.row_id())
    }
}

/// Rows found through one of the table's indexes.
#[derive(Debug)]
pub struct IndexScan {
    spec: IndexScanSpec,
    /// Position in `Table::indexes`, bound by `init_more`
    index: Option<usize>,
    rows: Vec<RowId>,
    next: usize,
}

impl IndexScan {
    pub fn new(spec: IndexScanSpec) -> Self {
        Self {
            spec,
            index: None,
            rows: Vec::new(),
            next: 0,
        }
    }

    pub fn spec(&self) -> &IndexScanSpec {
        &self.spec
    }
}

impl ScanStrategy for IndexScan {
    fn init_more(&mut self, table: &Table) -> Result<(), DbError> {
        let position = table
            .indexes()
            .iter()
            .position(|index| index.name() == self.spec.index_name)
            .ok_or_else(|| {
                DbError::Initialization(format!(
                    "index '{}' not found on table '{}'",
                    self.spec.index_name,
                    table.name()
                ))
            })?;
        let key_columns = table.indexes()[position].column_indices().len();
        if self.spec.search_keys.len() > key_columns {
            return Err(DbError::Initialization(format!(
                "{} search keys for index '{}' with {} key columns",
                self.spec.search_keys.len(),
                self.spec.index_name,
                key_columns
            )));
        }
        self.index = Some(position);
        Ok(())
    }

    fn begin(&mut self, table: &Table, params: &[Value]) -> Result<(), DbError> {
        let position = self.index.ok_or_else(|| {
            DbError::Initialization(format!("index '{}' is not bound", self.spec.index_name))
        })?;
        let index = table.indexes().get(position).ok_or_else(|| {
            DbError::Initialization(format!(
                "index '{}' no longer exists on table '{}'",
                self.spec.index_name,
                table.name()
            ))
        })?;

        // Keys compare by variant, so search values take the key column types.
        let mut search = Vec::with_capacity(self.spec.search_keys.len());
        for (expression, &column) in self.spec.search_keys.iter().zip(index.column_indices()) {
            let value = expression.eval(None, params)?;
            search.push(value.coerce_to(table.schema().column_type(column))?);
        }

        self.next = 0;
        // A comparison with NULL is never true.
        if search.iter().any(Value::is_null) {
            self.rows.clear();
            return Ok(());
        }

        self.rows = index.lookup(self.spec.lookup_type, &search)?;
        if matches!(self.spec.lookup_type, LookupType::Lt | LookupType::Lte) {
            // NULL keys sort first, below every search key.
            if let Some(&leading) = index.column_indices().first() {
                self.rows
                    .retain(|&row| table.tuple(row).is_some_and(|t| !t.is_null(leading)));
            }
        }
        if self.spec.is_descending() {
            self.rows.reverse();
        }
        trace!(
            "Index '{}' produced {} candidates",
            self.spec.index_name,
            self.rows.len()
        );
        Ok(())
    }

    fn next_candidate(&mut self, _table: &Table) -> Option<RowId> {
        let row = self.rows.get(self.next).copied()?;
        self.next += 1;
        Some(row)
    }
}
