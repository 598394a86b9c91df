//! Binary table serialization.
//!
//! Stream layout, big-endian throughout:
//!
//! ```text
//! i32  length of everything that follows
//! i16  column count
//!      per column: u8 type tag, u8 flags, i32 declared size
//! i32  row count
//!      rows in storage order, columns in schema order:
//!        fixed-width   natural width, NULL as the type's sentinel
//!        var-length    i32 length (-1 for NULL) then bytes
//! ```
//!
//! The in-memory and file transports produce identical bytes.

mod codec;
mod input;
pub mod io_utils;
mod output;

pub use codec::{
    min_row_width, read_row, read_schema_header, write_row, write_schema_header, write_tuple,
};
#[cfg(feature = "persist")]
pub use input::MappedFile;
pub use input::{BufferInput, FileInput, SerializeInput};
pub use output::{BufferOutput, FileOutput, SerializeOutput};

use crate::error::DbError;
use crate::table::Table;

/// Column flag: variable-length data stored inline.
pub const FLAG_INLINED: u8 = 0x01;
/// Column flag: NULL allowed.
pub const FLAG_NULLABLE: u8 = 0x02;
/// Length written for a NULL variable-length value.
pub const NULL_LENGTH: i32 = -1;

/// Serializes `table` into a fresh buffer.
pub fn serialize_table_to_vec(table: &Table) -> Result<Vec<u8>, DbError> {
    let mut out = BufferOutput::new();
    table.serialize_to(&mut out)?;
    Ok(out.into_inner())
}

/// Reads a length-prefixed table stream into `table`.
///
/// # Arguments
/// * `table` - Destination; must have a structurally equal schema
/// * `input` - Stream positioned at the length prefix
///
/// # Returns
/// `Result<usize, DbError>` with the number of rows loaded. On error the
/// table is unchanged.
pub fn deserialize_table<I: SerializeInput + ?Sized>(
    table: &mut Table,
    input: &mut I,
) -> Result<usize, DbError> {
    let declared = input.read_i32()?;
    let declared = usize::try_from(declared)
        .map_err(|_| DbError::Deserialization(format!("negative stream length {}", declared)))?;
    if declared > input.remaining() {
        return Err(DbError::Truncated {
            needed: declared,
            remaining: input.remaining(),
        });
    }

    let mut framed = FramedInput {
        inner: input,
        remaining: declared,
    };
    table.load_tuples_exact(&mut framed)
}

/// View of the next `remaining` bytes of another input.
struct FramedInput<'a, I: SerializeInput + ?Sized> {
    inner: &'a mut I,
    remaining: usize,
}

impl<I: SerializeInput + ?Sized> SerializeInput for FramedInput<'_, I> {
    fn read_into(&mut self, buf: &mut [u8]) -> Result<(), DbError> {
        if buf.len() > self.remaining {
            return Err(DbError::Truncated {
                needed: buf.len(),
                remaining: self.remaining,
            });
        }
        self.inner.read_into(buf)?;
        self.remaining -= buf.len();
        Ok(())
    }

    fn remaining(&self) -> usize {
        self.remaining
    }
}
