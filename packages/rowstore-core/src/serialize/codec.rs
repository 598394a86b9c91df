//! Schema header and row encodings.

use super::input::SerializeInput;
use super::output::SerializeOutput;
use super::{FLAG_INLINED, FLAG_NULLABLE, NULL_LENGTH};
use crate::error::DbError;
use crate::schema::{ColumnDescriptor, TupleSchema};
use crate::tuple::TupleRef;
use crate::types::{ObjectRef, Value, ValueType};

/// Writes the column count and one `{tag, flags, declared size}` entry per column.
pub fn write_schema_header<O: SerializeOutput + ?Sized>(
    out: &mut O,
    schema: &TupleSchema,
) -> Result<(), DbError> {
    let count = i16::try_from(schema.column_count()).map_err(|_| DbError::CapacityOverflow {
        operation: "column count encoding",
    })?;
    out.write_i16(count)?;
    for column in schema.columns() {
        let mut flags = 0u8;
        if column.inlined {
            flags |= FLAG_INLINED;
        }
        if column.allow_null {
            flags |= FLAG_NULLABLE;
        }
        let size = i32::try_from(column.declared_size).map_err(|_| DbError::CapacityOverflow {
            operation: "declared size encoding",
        })?;
        out.write_u8(column.value_type.tag())?;
        out.write_u8(flags)?;
        out.write_i32(size)?;
    }
    Ok(())
}

/// Reads a schema header written by [`write_schema_header`].
pub fn read_schema_header<I: SerializeInput + ?Sized>(input: &mut I) -> Result<TupleSchema, DbError> {
    let count = input.read_i16()?;
    if count <= 0 {
        return Err(DbError::Deserialization(format!(
            "invalid column count {}",
            count
        )));
    }

    let mut descriptors = Vec::with_capacity(count as usize);
    for index in 0..count {
        let tag = input.read_u8()?;
        let value_type = ValueType::from_tag(tag).ok_or_else(|| {
            DbError::Deserialization(format!("unknown type tag {} for column {}", tag, index))
        })?;
        let flags = input.read_u8()?;
        if flags & !(FLAG_INLINED | FLAG_NULLABLE) != 0 {
            return Err(DbError::Deserialization(format!(
                "unknown column flags {:#04x} for column {}",
                flags, index
            )));
        }
        let size = input.read_i32()?;
        let declared_size = usize::try_from(size).map_err(|_| {
            DbError::Deserialization(format!("negative declared size for column {}", index))
        })?;
        descriptors.push(ColumnDescriptor {
            value_type,
            declared_size,
            allow_null: flags & FLAG_NULLABLE != 0,
            inlined: flags & FLAG_INLINED != 0,
        });
    }

    TupleSchema::from_descriptors(&descriptors)
        .map_err(|e| DbError::Deserialization(format!("invalid schema header: {}", e)))
}

/// Smallest encoded size of one row.
pub fn min_row_width(schema: &TupleSchema) -> usize {
    schema
        .columns()
        .iter()
        .map(|c| c.value_type.fixed_width().unwrap_or(4))
        .sum()
}

/// Encodes one row of values already matching the schema's column types.
pub fn write_row<O: SerializeOutput + ?Sized>(
    out: &mut O,
    schema: &TupleSchema,
    values: &[Value],
) -> Result<(), DbError> {
    for (column, value) in schema.columns().iter().zip(values) {
        write_value(out, column.value_type, value)?;
    }
    Ok(())
}

/// Encodes a stored tuple.
pub fn write_tuple<O: SerializeOutput + ?Sized>(
    out: &mut O,
    tuple: &TupleRef<'_>,
) -> Result<(), DbError> {
    for index in 0..tuple.column_count() {
        let value = tuple.get_value(index);
        write_value(out, tuple.schema().column_type(index), &value)?;
    }
    Ok(())
}

fn write_value<O: SerializeOutput + ?Sized>(
    out: &mut O,
    value_type: ValueType,
    value: &Value,
) -> Result<(), DbError> {
    match (value_type, value) {
        (ValueType::TinyInt, Value::Null(_)) => out.write_i8(i8::MIN),
        (ValueType::SmallInt, Value::Null(_)) => out.write_i16(i16::MIN),
        (ValueType::Integer, Value::Null(_)) => out.write_i32(i32::MIN),
        (ValueType::BigInt | ValueType::Timestamp, Value::Null(_)) => out.write_i64(i64::MIN),
        (ValueType::Double, Value::Null(_)) => out.write_f64(f64::MIN),
        (ValueType::Varchar | ValueType::Varbinary, Value::Null(_)) => out.write_i32(NULL_LENGTH),
        (ValueType::TinyInt, Value::TinyInt(v)) => out.write_i8(*v),
        (ValueType::SmallInt, Value::SmallInt(v)) => out.write_i16(*v),
        (ValueType::Integer, Value::Integer(v)) => out.write_i32(*v),
        (ValueType::BigInt, Value::BigInt(v)) | (ValueType::Timestamp, Value::Timestamp(v)) => {
            out.write_i64(*v)
        }
        (ValueType::Double, Value::Double(v)) => out.write_f64(*v),
        (ValueType::Varchar, Value::Varchar(obj)) | (ValueType::Varbinary, Value::Varbinary(obj)) => {
            let len = i32::try_from(obj.len()).map_err(|_| DbError::CapacityOverflow {
                operation: "object length encoding",
            })?;
            out.write_i32(len)?;
            out.write_bytes(obj.as_bytes())
        }
        (expected, got) => Err(DbError::TypeMismatch {
            expected: expected.to_string(),
            got: got.value_type().to_string(),
        }),
    }
}

/// Decodes one row.
pub fn read_row<I: SerializeInput + ?Sized>(
    input: &mut I,
    schema: &TupleSchema,
) -> Result<Vec<Value>, DbError> {
    schema
        .columns()
        .iter()
        .map(|column| read_value(input, column.value_type))
        .collect()
}

fn read_value<I: SerializeInput + ?Sized>(
    input: &mut I,
    value_type: ValueType,
) -> Result<Value, DbError> {
    let null = Value::Null(value_type);
    Ok(match value_type {
        ValueType::TinyInt => match input.read_i8()? {
            i8::MIN => null,
            v => Value::TinyInt(v),
        },
        ValueType::SmallInt => match input.read_i16()? {
            i16::MIN => null,
            v => Value::SmallInt(v),
        },
        ValueType::Integer => match input.read_i32()? {
            i32::MIN => null,
            v => Value::Integer(v),
        },
        ValueType::BigInt => match input.read_i64()? {
            i64::MIN => null,
            v => Value::BigInt(v),
        },
        ValueType::Timestamp => match input.read_i64()? {
            i64::MIN => null,
            v => Value::Timestamp(v),
        },
        ValueType::Double => {
            let v = input.read_f64()?;
            if v == f64::MIN {
                null
            } else {
                Value::Double(v)
            }
        }
        ValueType::Varchar | ValueType::Varbinary => {
            let len = input.read_i32()?;
            if len == NULL_LENGTH {
                return Ok(null);
            }
            let len = usize::try_from(len).map_err(|_| {
                DbError::Deserialization(format!("invalid object length {}", len))
            })?;
            let bytes = input.read_bytes(len)?;
            if value_type == ValueType::Varchar {
                if std::str::from_utf8(&bytes).is_err() {
                    return Err(DbError::Deserialization(
                        "VARCHAR payload is not valid UTF-8".to_string(),
                    ));
                }
                Value::Varchar(ObjectRef::new(&bytes))
            } else {
                Value::Varbinary(ObjectRef::new(&bytes))
            }
        }
    })
}
