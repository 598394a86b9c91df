//! Tuple views over row bytes.
//!
//! A [`TupleRef`] borrows its table, so it cannot outlive an insert, delete
//! or update on that table. Row bytes use a private little-endian layout; the
//! wire format lives in [`crate::serialize`].

use std::fmt;

use crate::error::DbError;
use crate::schema::{ColumnInfo, TupleSchema};
use crate::storage::{ObjectPool, RowId, NULL_OBJECT_HANDLE};
use crate::types::{ObjectRef, Value, ValueType};

/// Null flag in the length byte of an inlined variable-length column.
const INLINE_NULL_FLAG: u8 = 0x80;

/// Read-only view of one stored row.
#[derive(Clone, Copy)]
pub struct TupleRef<'a> {
    schema: &'a TupleSchema,
    data: &'a [u8],
    objects: &'a ObjectPool,
    row: RowId,
}

impl<'a> TupleRef<'a> {
    pub(crate) fn new(
        schema: &'a TupleSchema,
        data: &'a [u8],
        objects: &'a ObjectPool,
        row: RowId,
    ) -> Self {
        Self {
            schema,
            data,
            objects,
            row,
        }
    }

    pub fn row_id(&self) -> RowId {
        self.row
    }

    pub fn schema(&self) -> &'a TupleSchema {
        self.schema
    }

    pub fn column_count(&self) -> usize {
        self.schema.column_count()
    }

    /// Raw row bytes.
    pub fn raw_data(&self) -> &'a [u8] {
        self.data
    }

    /// Reads column `index`.
    ///
    /// Out-of-line payloads are shared with the table's pool rather than
    /// copied.
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    pub fn get_value(&self, index: usize) -> Value {
        let column = &self.schema.columns()[index];
        read_column(column, self.data, self.objects)
    }

    pub fn is_null(&self, index: usize) -> bool {
        self.get_value(index).is_null()
    }

    /// All column values in schema order.
    pub fn values(&self) -> Vec<Value> {
        self.schema
            .columns()
            .iter()
            .map(|column| read_column(column, self.data, self.objects))
            .collect()
    }

    /// Values of the given columns, in the given order.
    pub fn project(&self, columns: &[usize]) -> Vec<Value> {
        columns.iter().map(|&c| self.get_value(c)).collect()
    }
}

impl fmt::Debug for TupleRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TupleRef")
            .field("row", &self.row)
            .field("values", &self.values())
            .finish()
    }
}

fn read_fixed<const N: usize>(data: &[u8], offset: usize) -> [u8; N] {
    let mut buf = [0u8; N];
    buf.copy_from_slice(&data[offset..offset + N]);
    buf
}

fn read_column(column: &ColumnInfo, data: &[u8], objects: &ObjectPool) -> Value {
    let at = column.offset;
    let t = column.value_type;
    match t {
        ValueType::TinyInt => match i8::from_le_bytes(read_fixed(data, at)) {
            i8::MIN => Value::Null(t),
            v => Value::TinyInt(v),
        },
        ValueType::SmallInt => match i16::from_le_bytes(read_fixed(data, at)) {
            i16::MIN => Value::Null(t),
            v => Value::SmallInt(v),
        },
        ValueType::Integer => match i32::from_le_bytes(read_fixed(data, at)) {
            i32::MIN => Value::Null(t),
            v => Value::Integer(v),
        },
        ValueType::BigInt | ValueType::Timestamp => {
            match i64::from_le_bytes(read_fixed(data, at)) {
                i64::MIN => Value::Null(t),
                v if t == ValueType::BigInt => Value::BigInt(v),
                v => Value::Timestamp(v),
            }
        }
        ValueType::Double => {
            let v = f64::from_le_bytes(read_fixed(data, at));
            if v == f64::MIN {
                Value::Null(t)
            } else {
                Value::Double(v)
            }
        }
        ValueType::Varchar | ValueType::Varbinary => {
            let object = if column.inlined {
                let header = data[at];
                if header & INLINE_NULL_FLAG != 0 {
                    None
                } else {
                    let len = header as usize;
                    Some(ObjectRef::new(&data[at + 1..at + 1 + len]))
                }
            } else {
                match u32::from_le_bytes(read_fixed(data, at)) {
                    NULL_OBJECT_HANDLE => None,
                    handle => objects.get(handle).cloned(),
                }
            };
            match (object, t) {
                (None, _) => Value::Null(t),
                (Some(obj), ValueType::Varchar) => Value::Varchar(obj),
                (Some(obj), _) => Value::Varbinary(obj),
            }
        }
    }
}

/// Writes an already-validated value into column `index` of `data`.
///
/// Out-of-line payloads are placed in `objects`; the caller releases any
/// handle the column held before.
pub(crate) fn write_column(
    schema: &TupleSchema,
    data: &mut [u8],
    objects: &mut ObjectPool,
    index: usize,
    value: &Value,
) -> Result<(), DbError> {
    let column = &schema.columns()[index];
    let at = column.offset;
    let slot = &mut data[at..at + column.storage_size];

    match (column.value_type, value) {
        (ValueType::TinyInt, Value::Null(_)) => slot.copy_from_slice(&i8::MIN.to_le_bytes()),
        (ValueType::SmallInt, Value::Null(_)) => slot.copy_from_slice(&i16::MIN.to_le_bytes()),
        (ValueType::Integer, Value::Null(_)) => slot.copy_from_slice(&i32::MIN.to_le_bytes()),
        (ValueType::BigInt | ValueType::Timestamp, Value::Null(_)) => {
            slot.copy_from_slice(&i64::MIN.to_le_bytes())
        }
        (ValueType::Double, Value::Null(_)) => slot.copy_from_slice(&f64::MIN.to_le_bytes()),
        (ValueType::TinyInt, Value::TinyInt(v)) => slot.copy_from_slice(&v.to_le_bytes()),
        (ValueType::SmallInt, Value::SmallInt(v)) => slot.copy_from_slice(&v.to_le_bytes()),
        (ValueType::Integer, Value::Integer(v)) => slot.copy_from_slice(&v.to_le_bytes()),
        (ValueType::BigInt, Value::BigInt(v)) | (ValueType::Timestamp, Value::Timestamp(v)) => {
            slot.copy_from_slice(&v.to_le_bytes())
        }
        (ValueType::Double, Value::Double(v)) => slot.copy_from_slice(&v.to_le_bytes()),
        (ValueType::Varchar | ValueType::Varbinary, Value::Null(_)) => {
            if column.inlined {
                slot.fill(0);
                slot[0] = INLINE_NULL_FLAG;
            } else {
                slot.copy_from_slice(&NULL_OBJECT_HANDLE.to_le_bytes());
            }
        }
        (ValueType::Varchar, Value::Varchar(obj)) | (ValueType::Varbinary, Value::Varbinary(obj)) => {
            if column.inlined {
                let bytes = obj.as_bytes();
                slot.fill(0);
                slot[0] = bytes.len() as u8;
                slot[1..1 + bytes.len()].copy_from_slice(bytes);
            } else {
                let handle = objects.store(obj)?;
                slot.copy_from_slice(&handle.to_le_bytes());
            }
        }
        (expected, got) => {
            return Err(DbError::TypeMismatch {
                expected: expected.to_string(),
                got: got.value_type().to_string(),
            })
        }
    }
    Ok(())
}

/// Handles of the non-null out-of-line columns in `data`.
pub(crate) fn object_handles(schema: &TupleSchema, data: &[u8]) -> Vec<u32> {
    leading_object_handles(schema, data, schema.column_count())
}

/// Handles of the non-null out-of-line columns among the first `count`.
pub(crate) fn leading_object_handles(schema: &TupleSchema, data: &[u8], count: usize) -> Vec<u32> {
    schema
        .uninlined_object_columns()
        .iter()
        .filter(|&&c| c < count)
        .map(|&c| u32::from_le_bytes(read_fixed(data, schema.columns()[c].offset)))
        .filter(|&h| h != NULL_OBJECT_HANDLE)
        .collect()
}
