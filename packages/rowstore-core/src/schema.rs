//! Tuple schema: ordered column descriptors and the row layout they imply.
//!
//! Rows are packed without padding. Fixed-width columns take their natural
//! width, inlined variable-length columns take one length byte plus their
//! declared size, and out-of-line columns take a 4-byte object handle.

use crate::error::DbError;
use crate::types::{ValueType, MAX_VARIABLE_LENGTH, UNINLINEABLE_OBJECT_LENGTH};

/// Width of the object handle stored for an out-of-line column.
pub const OBJECT_HANDLE_SIZE: usize = 4;

/// Caller-facing description of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub value_type: ValueType,
    pub declared_size: usize,
    pub allow_null: bool,
    pub inlined: bool,
}

/// Resolved column layout.
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    /// Column type
    pub value_type: ValueType,
    /// Declared size (natural width for fixed-width types)
    pub declared_size: usize,
    /// Whether variable-length data is stored inside the row
    pub inlined: bool,
    /// Whether NULL may be stored
    pub allow_null: bool,
    /// Byte offset within the row
    pub offset: usize,
    /// Bytes occupied within the row
    pub storage_size: usize,
}

impl ColumnInfo {
    pub fn descriptor(&self) -> ColumnDescriptor {
        ColumnDescriptor {
            value_type: self.value_type,
            declared_size: self.declared_size,
            allow_null: self.allow_null,
            inlined: self.inlined,
        }
    }
}

/// Ordered, immutable column layout shared by every tuple of a table.
#[derive(Debug, Clone)]
pub struct TupleSchema {
    columns: Vec<ColumnInfo>,
    tuple_length: usize,
    uninlined_columns: Vec<usize>,
}

impl TupleSchema {
    /// Builds a schema, storing short variable-length columns inline.
    ///
    /// # Arguments
    /// * `types` - Column types in order
    /// * `sizes` - Declared sizes; 0 or the natural width for fixed-width types
    /// * `allow_null` - Per-column nullability
    ///
    /// # Returns
    /// `Result<TupleSchema, DbError>` with the schema, or `InvalidSchema`.
    pub fn build(
        types: &[ValueType],
        sizes: &[usize],
        allow_null: &[bool],
    ) -> Result<Self, DbError> {
        Self::build_with_policy(types, sizes, allow_null, true)
    }

    /// Builds a schema that keeps every variable-length column out of line.
    pub fn build_without_inlining(
        types: &[ValueType],
        sizes: &[usize],
        allow_null: &[bool],
    ) -> Result<Self, DbError> {
        Self::build_with_policy(types, sizes, allow_null, false)
    }

    fn build_with_policy(
        types: &[ValueType],
        sizes: &[usize],
        allow_null: &[bool],
        allow_inlined_objects: bool,
    ) -> Result<Self, DbError> {
        if types.len() != sizes.len() || types.len() != allow_null.len() {
            return Err(DbError::InvalidSchema(format!(
                "{} types, {} sizes and {} nullability flags",
                types.len(),
                sizes.len(),
                allow_null.len()
            )));
        }
        let descriptors = types
            .iter()
            .zip(sizes)
            .zip(allow_null)
            .map(|((&value_type, &declared_size), &allow_null)| ColumnDescriptor {
                value_type,
                declared_size,
                allow_null,
                inlined: match value_type.fixed_width() {
                    Some(_) => true,
                    None => allow_inlined_objects && declared_size < UNINLINEABLE_OBJECT_LENGTH,
                },
            })
            .collect::<Vec<_>>();
        Self::from_descriptors(&descriptors)
    }

    /// Builds a schema from explicit descriptors, as read from a stream header.
    pub fn from_descriptors(descriptors: &[ColumnDescriptor]) -> Result<Self, DbError> {
        if descriptors.is_empty() {
            return Err(DbError::InvalidSchema("schema has no columns".to_string()));
        }

        let mut columns = Vec::with_capacity(descriptors.len());
        let mut uninlined_columns = Vec::new();
        let mut offset = 0usize;

        for (index, desc) in descriptors.iter().enumerate() {
            let (declared_size, storage_size) = column_storage(index, desc)?;
            if !desc.inlined {
                uninlined_columns.push(index);
            }
            columns.push(ColumnInfo {
                value_type: desc.value_type,
                declared_size,
                inlined: desc.inlined,
                allow_null: desc.allow_null,
                offset,
                storage_size,
            });
            offset = offset
                .checked_add(storage_size)
                .ok_or(DbError::CapacityOverflow {
                    operation: "tuple length calculation",
                })?;
        }

        Ok(Self {
            columns,
            tuple_length: offset,
            uninlined_columns,
        })
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Bytes occupied by one row.
    pub fn tuple_length(&self) -> usize {
        self.tuple_length
    }

    /// # Panics
    /// Panics if `index` is out of range.
    pub fn column_type(&self, index: usize) -> ValueType {
        self.columns[index].value_type
    }

    pub fn column_is_inlined(&self, index: usize) -> bool {
        self.columns[index].inlined
    }

    pub fn column_allow_null(&self, index: usize) -> bool {
        self.columns[index].allow_null
    }

    pub fn column_declared_size(&self, index: usize) -> usize {
        self.columns[index].declared_size
    }

    pub fn get_column_info(&self, index: usize) -> Option<&ColumnInfo> {
        self.columns.get(index)
    }

    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    /// Indices of columns whose data lives in the object pool.
    pub fn uninlined_object_columns(&self) -> &[usize] {
        &self.uninlined_columns
    }
}

impl PartialEq for TupleSchema {
    fn eq(&self, other: &Self) -> bool {
        self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|(a, b)| a.descriptor() == b.descriptor())
    }
}

impl Eq for TupleSchema {}

/// Validates a descriptor and returns its normalized declared size and row width.
fn column_storage(index: usize, desc: &ColumnDescriptor) -> Result<(usize, usize), DbError> {
    match desc.value_type.fixed_width() {
        Some(width) => {
            if desc.declared_size != 0 && desc.declared_size != width {
                return Err(DbError::InvalidSchema(format!(
                    "column {} of type {} declares size {}",
                    index, desc.value_type, desc.declared_size
                )));
            }
            if !desc.inlined {
                return Err(DbError::InvalidSchema(format!(
                    "fixed-width column {} cannot be stored out of line",
                    index
                )));
            }
            Ok((width, width))
        }
        None => {
            if desc.declared_size == 0 || desc.declared_size > MAX_VARIABLE_LENGTH {
                return Err(DbError::InvalidSchema(format!(
                    "column {} of type {} declares size {}",
                    index, desc.value_type, desc.declared_size
                )));
            }
            if desc.inlined {
                if desc.declared_size >= UNINLINEABLE_OBJECT_LENGTH {
                    return Err(DbError::InvalidSchema(format!(
                        "column {} is too large to inline ({} bytes)",
                        index, desc.declared_size
                    )));
                }
                Ok((desc.declared_size, desc.declared_size + 1))
            } else {
                Ok((desc.declared_size, OBJECT_HANDLE_SIZE))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ntest::timeout;

    #[timeout(1000)]
    #[test]
    fn test_build_computes_offsets() {
        let schema = TupleSchema::build(
            &[ValueType::TinyInt, ValueType::BigInt, ValueType::Varchar, ValueType::Varchar],
            &[0, 8, 20, 200],
            &[false, true, true, true],
        )
        .unwrap();

        assert_eq!(schema.column_count(), 4);
        assert_eq!(schema.get_column_info(1).unwrap().offset, 1);
        assert!(schema.column_is_inlined(2));
        assert!(!schema.column_is_inlined(3));
        assert_eq!(schema.get_column_info(3).unwrap().offset, 1 + 8 + 21);
        assert_eq!(schema.tuple_length(), 1 + 8 + 21 + OBJECT_HANDLE_SIZE);
        assert_eq!(schema.uninlined_object_columns(), &[3]);
        assert_eq!(schema.column_declared_size(0), 1);
        assert!(!schema.column_allow_null(0));
    }

    #[timeout(1000)]
    #[test]
    fn test_without_inlining_moves_short_strings_out_of_line() {
        let schema = TupleSchema::build_without_inlining(
            &[ValueType::Varchar, ValueType::Integer],
            &[20, 4],
            &[true, true],
        )
        .unwrap();
        assert!(!schema.column_is_inlined(0));
        assert!(schema.column_is_inlined(1));
        assert_eq!(schema.tuple_length(), OBJECT_HANDLE_SIZE + 4);
    }

    #[timeout(1000)]
    #[test]
    fn test_mismatched_lengths_rejected() {
        let result = TupleSchema::build(&[ValueType::Integer, ValueType::BigInt], &[4], &[true, true]);
        match result {
            Err(DbError::InvalidSchema(_)) => {}
            _ => panic!("Expected InvalidSchema"),
        }
    }

    #[timeout(1000)]
    #[test]
    fn test_invalid_sizes_rejected() {
        assert!(TupleSchema::build(&[ValueType::Integer], &[3], &[true]).is_err());
        assert!(TupleSchema::build(&[ValueType::Varchar], &[0], &[true]).is_err());
        assert!(
            TupleSchema::build(&[ValueType::Varbinary], &[MAX_VARIABLE_LENGTH + 1], &[true]).is_err()
        );
        assert!(TupleSchema::build(&[], &[], &[]).is_err());
    }

    #[timeout(1000)]
    #[test]
    fn test_descriptor_inline_flag_validated() {
        let too_big = ColumnDescriptor {
            value_type: ValueType::Varchar,
            declared_size: 100,
            allow_null: true,
            inlined: true,
        };
        assert!(TupleSchema::from_descriptors(&[too_big]).is_err());

        let fixed_out_of_line = ColumnDescriptor {
            value_type: ValueType::BigInt,
            declared_size: 8,
            allow_null: true,
            inlined: false,
        };
        assert!(TupleSchema::from_descriptors(&[fixed_out_of_line]).is_err());
    }

    #[timeout(1000)]
    #[test]
    fn test_structural_equality() {
        let a = TupleSchema::build(&[ValueType::Integer, ValueType::Varchar], &[0, 10], &[true, false]).unwrap();
        let b = TupleSchema::build(&[ValueType::Integer, ValueType::Varchar], &[4, 10], &[true, false]).unwrap();
        let c = TupleSchema::build(&[ValueType::Integer, ValueType::Varchar], &[4, 10], &[true, true]).unwrap();
        let d = TupleSchema::build_without_inlining(&[ValueType::Integer, ValueType::Varchar], &[4, 10], &[true, false]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }
}
