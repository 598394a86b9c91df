//! Table-level serialization: header, row count and rows.

use super::table::Table;
use crate::error::DbError;
use crate::serialize::{
    min_row_width, read_row, read_schema_header, write_schema_header, write_tuple, SerializeInput,
    SerializeOutput,
};
use crate::types::Value;

impl Table {
    /// Writes the table as a length-prefixed stream.
    ///
    /// # Returns
    /// `Result<usize, DbError>` with the total bytes written, prefix included.
    pub fn serialize_to<O: SerializeOutput + ?Sized>(&self, out: &mut O) -> Result<usize, DbError> {
        let start = out.position();
        let length_at = out.reserve_i32()?;

        write_schema_header(out, &self.schema)?;
        let row_count = i32::try_from(self.active_tuple_count()).map_err(|_| {
            DbError::CapacityOverflow {
                operation: "row count encoding",
            }
        })?;
        out.write_i32(row_count)?;
        for tuple in self.iter() {
            write_tuple(out, &tuple)?;
        }

        let body = out.position() - length_at - 4;
        let body = i32::try_from(body).map_err(|_| DbError::CapacityOverflow {
            operation: "stream length encoding",
        })?;
        out.write_i32_at(length_at, body)?;

        let written = out.position() - start;
        tracing::debug!(
            "Serialized {} rows of '{}' ({} bytes)",
            row_count,
            self.name,
            written
        );
        Ok(written)
    }

    /// Loads rows from a stream positioned just after the length prefix.
    ///
    /// All rows are decoded and validated before any is inserted. If an insert
    /// fails the rows already inserted by this call are removed again, so the
    /// table is unchanged on every error.
    ///
    /// # Returns
    /// `Result<usize, DbError>` with the number of rows loaded.
    pub fn load_tuples_from<I: SerializeInput + ?Sized>(
        &mut self,
        input: &mut I,
    ) -> Result<usize, DbError> {
        self.load_tuples(input, false)
    }

    /// Like [`load_tuples_from`](Self::load_tuples_from), but the input must
    /// be consumed completely.
    pub(crate) fn load_tuples_exact<I: SerializeInput + ?Sized>(
        &mut self,
        input: &mut I,
    ) -> Result<usize, DbError> {
        self.load_tuples(input, true)
    }

    fn load_tuples<I: SerializeInput + ?Sized>(
        &mut self,
        input: &mut I,
        require_exhausted: bool,
    ) -> Result<usize, DbError> {
        if self.is_streamed() {
            return Err(DbError::UnsupportedOperation {
                table: self.name.clone(),
                operation: "load",
            });
        }

        let schema = read_schema_header(input)?;
        if schema != *self.schema {
            return Err(DbError::SchemaMismatch(format!(
                "stream has {} columns that do not match table '{}' ({} columns)",
                schema.column_count(),
                self.name,
                self.schema.column_count()
            )));
        }

        let row_count = input.read_i32()?;
        let row_count = usize::try_from(row_count)
            .map_err(|_| DbError::Deserialization(format!("negative row count {}", row_count)))?;
        let min_bytes = row_count
            .checked_mul(min_row_width(&self.schema))
            .ok_or(DbError::CapacityOverflow {
                operation: "row count validation",
            })?;
        if min_bytes > input.remaining() {
            return Err(DbError::Deserialization(format!(
                "row count {} needs at least {} bytes, {} remain",
                row_count,
                min_bytes,
                input.remaining()
            )));
        }

        let mut staged: Vec<Vec<Value>> = Vec::with_capacity(row_count);
        for _ in 0..row_count {
            let values = read_row(input, &self.schema)?;
            staged.push(self.prepare_values(&values)?);
        }
        if require_exhausted && input.remaining() > 0 {
            return Err(DbError::Deserialization(format!(
                "{} trailing bytes after {} rows",
                input.remaining(),
                row_count
            )));
        }

        let mut inserted = Vec::with_capacity(staged.len());
        for values in &staged {
            match self.insert_prepared(values) {
                Ok(Some(row)) => inserted.push(row),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(
                        "Load into '{}' failed after {} rows, rolling back: {}",
                        self.name,
                        inserted.len(),
                        err
                    );
                    for row in inserted.into_iter().rev() {
                        self.release_row(row);
                    }
                    return Err(err);
                }
            }
        }

        tracing::debug!("Loaded {} rows into '{}'", inserted.len(), self.name);
        Ok(inserted.len())
    }
}
