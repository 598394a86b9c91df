//! Export stream for streamed tables and export-enabled persistent tables.
//!
//! Each record is `i64 sequence, u8 op, row`, with the row in the table
//! serialization encoding.

use crate::error::DbError;
use crate::schema::TupleSchema;
use crate::serialize::{write_row, BufferOutput, SerializeOutput};
use crate::types::Value;

/// Kind of change carried by an export record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExportOp {
    Insert = 1,
    Delete = 2,
}

/// Records handed out by [`ExportStream::drain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportBatch {
    /// Sequence number of the first record
    pub first_sequence: i64,
    pub row_count: usize,
    pub bytes: Vec<u8>,
}

/// Append-only buffer of export records.
#[derive(Debug, Default)]
pub struct ExportStream {
    buffer: BufferOutput,
    next_sequence: i64,
    first_pending: i64,
    pending_rows: usize,
}

impl ExportStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(
        &mut self,
        schema: &TupleSchema,
        op: ExportOp,
        values: &[Value],
    ) -> Result<(), DbError> {
        if self.pending_rows == 0 {
            self.first_pending = self.next_sequence;
        }
        self.buffer.write_i64(self.next_sequence)?;
        self.buffer.write_u8(op as u8)?;
        write_row(&mut self.buffer, schema, values)?;
        self.next_sequence += 1;
        self.pending_rows += 1;
        Ok(())
    }

    /// Records appended since the last drain.
    pub fn pending_rows(&self) -> usize {
        self.pending_rows
    }

    /// Hands out everything appended since the last drain.
    pub fn drain(&mut self) -> ExportBatch {
        let batch = ExportBatch {
            first_sequence: self.first_pending,
            row_count: self.pending_rows,
            bytes: self.buffer.take(),
        };
        self.pending_rows = 0;
        self.first_pending = self.next_sequence;
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ValueType;

    #[test]
    fn test_append_and_drain() {
        let schema = TupleSchema::build(&[ValueType::Integer], &[4], &[true]).unwrap();
        let mut stream = ExportStream::new();
        stream.append(&schema, ExportOp::Insert, &[Value::Integer(7)]).unwrap();
        stream.append(&schema, ExportOp::Delete, &[Value::Integer(7)]).unwrap();

        let batch = stream.drain();
        assert_eq!(batch.first_sequence, 0);
        assert_eq!(batch.row_count, 2);
        assert_eq!(&batch.bytes[..13], &[0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 7]);
        assert_eq!(batch.bytes[21], 2);

        stream.append(&schema, ExportOp::Insert, &[Value::Integer(1)]).unwrap();
        let next = stream.drain();
        assert_eq!(next.first_sequence, 2);
        assert_eq!(next.row_count, 1);
        assert_eq!(stream.drain().row_count, 0);
    }
}
