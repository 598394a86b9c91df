//! Column value types and their wire tags.

use std::fmt;

use serde::{Deserialize, Serialize};

/// SQL column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValueType {
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Double,
    Varchar,
    Timestamp,
    Varbinary,
}

impl ValueType {
    /// Every supported type, in tag order.
    pub const ALL: [ValueType; 8] = [
        ValueType::TinyInt,
        ValueType::SmallInt,
        ValueType::Integer,
        ValueType::BigInt,
        ValueType::Double,
        ValueType::Varchar,
        ValueType::Timestamp,
        ValueType::Varbinary,
    ];

    /// Returns the one-byte tag written in serialized schema headers.
    pub const fn tag(self) -> u8 {
        match self {
            ValueType::TinyInt => 3,
            ValueType::SmallInt => 4,
            ValueType::Integer => 5,
            ValueType::BigInt => 6,
            ValueType::Double => 8,
            ValueType::Varchar => 9,
            ValueType::Timestamp => 11,
            ValueType::Varbinary => 25,
        }
    }

    /// Maps a serialized tag back to its type.
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.tag() == tag)
    }

    /// Natural width in bytes, or `None` for variable-length types.
    pub const fn fixed_width(self) -> Option<usize> {
        match self {
            ValueType::TinyInt => Some(1),
            ValueType::SmallInt => Some(2),
            ValueType::Integer => Some(4),
            ValueType::BigInt | ValueType::Double | ValueType::Timestamp => Some(8),
            ValueType::Varchar | ValueType::Varbinary => None,
        }
    }

    pub const fn is_variable_length(self) -> bool {
        self.fixed_width().is_none()
    }

    /// True for the integer family (not timestamps).
    pub const fn is_integral(self) -> bool {
        matches!(
            self,
            ValueType::TinyInt | ValueType::SmallInt | ValueType::Integer | ValueType::BigInt
        )
    }

    /// SQL name of the type.
    pub const fn name(self) -> &'static str {
        match self {
            ValueType::TinyInt => "TINYINT",
            ValueType::SmallInt => "SMALLINT",
            ValueType::Integer => "INTEGER",
            ValueType::BigInt => "BIGINT",
            ValueType::Double => "DOUBLE",
            ValueType::Varchar => "VARCHAR",
            ValueType::Timestamp => "TIMESTAMP",
            ValueType::Varbinary => "VARBINARY",
        }
    }

    /// Parses a SQL type name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(name))
    }

    /// Inclusive range of non-null values for integer-backed types.
    pub(crate) const fn integer_range(self) -> Option<(i64, i64)> {
        // The minimum of each width is reserved for NULL.
        match self {
            ValueType::TinyInt => Some((i8::MIN as i64 + 1, i8::MAX as i64)),
            ValueType::SmallInt => Some((i16::MIN as i64 + 1, i16::MAX as i64)),
            ValueType::Integer => Some((i32::MIN as i64 + 1, i32::MAX as i64)),
            ValueType::BigInt | ValueType::Timestamp => Some((i64::MIN + 1, i64::MAX)),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}
