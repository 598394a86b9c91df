//! Typed column values.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::object::ObjectRef;
use super::value_type::ValueType;
use crate::error::DbError;

/// A single column value.
///
/// NULL carries the type it stands for. Under key comparison NULL equals NULL
/// and sorts before every non-null value; [`Value::compare_sql`] gives the
/// SQL view where any comparison with NULL is unknown.
#[derive(Debug, Clone)]
pub enum Value {
    Null(ValueType),
    TinyInt(i8),
    SmallInt(i16),
    Integer(i32),
    BigInt(i64),
    Double(f64),
    Timestamp(i64),
    Varchar(ObjectRef),
    Varbinary(ObjectRef),
}

impl Value {
    pub fn null(value_type: ValueType) -> Self {
        Value::Null(value_type)
    }

    pub fn varchar(s: &str) -> Self {
        Value::Varchar(ObjectRef::new(s.as_bytes()))
    }

    pub fn varbinary(bytes: &[u8]) -> Self {
        Value::Varbinary(ObjectRef::new(bytes))
    }

    /// Boolean result encoded the way predicates produce it.
    pub fn boolean(b: bool) -> Self {
        Value::TinyInt(i8::from(b))
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null(t) => *t,
            Value::TinyInt(_) => ValueType::TinyInt,
            Value::SmallInt(_) => ValueType::SmallInt,
            Value::Integer(_) => ValueType::Integer,
            Value::BigInt(_) => ValueType::BigInt,
            Value::Double(_) => ValueType::Double,
            Value::Timestamp(_) => ValueType::Timestamp,
            Value::Varchar(_) => ValueType::Varchar,
            Value::Varbinary(_) => ValueType::Varbinary,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }

    /// True for a non-null, non-zero numeric value.
    pub fn is_true(&self) -> bool {
        match self {
            Value::Double(d) => *d != 0.0,
            other => other.as_i64().is_some_and(|v| v != 0),
        }
    }

    /// Integer view of integer-family and timestamp values.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::TinyInt(v) => Some(i64::from(*v)),
            Value::SmallInt(v) => Some(i64::from(*v)),
            Value::Integer(v) => Some(i64::from(*v)),
            Value::BigInt(v) | Value::Timestamp(v) => Some(*v),
            _ => None,
        }
    }

    /// Floating point view of any numeric value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    /// String view of a VARCHAR value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Varchar(obj) => std::str::from_utf8(obj.as_bytes()).ok(),
            _ => None,
        }
    }

    /// Payload of a VARCHAR or VARBINARY value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        self.object().map(ObjectRef::as_bytes)
    }

    pub fn object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Varchar(obj) | Value::Varbinary(obj) => Some(obj),
            _ => None,
        }
    }

    /// Converts the value to `target`, widening or narrowing integers with a
    /// range check. NULL converts to NULL of the target type.
    pub fn coerce_to(&self, target: ValueType) -> Result<Value, DbError> {
        if self.is_null() {
            return Ok(Value::Null(target));
        }
        if self.value_type() == target {
            return Ok(self.clone());
        }
        let mismatch = || DbError::TypeMismatch {
            expected: target.to_string(),
            got: self.value_type().to_string(),
        };
        if target.integer_range().is_some() {
            let n = self.as_i64().ok_or_else(mismatch)?;
            return Self::from_i64(target, n);
        }
        match target {
            ValueType::Double => self.as_i64().map(|n| Value::Double(n as f64)).ok_or_else(mismatch),
            _ => Err(mismatch()),
        }
    }

    fn from_i64(target: ValueType, n: i64) -> Result<Value, DbError> {
        let (min, max) = target.integer_range().ok_or_else(|| DbError::TypeMismatch {
            expected: target.to_string(),
            got: ValueType::BigInt.to_string(),
        })?;
        if n < min || n > max {
            return Err(DbError::ValueOutOfRange(format!(
                "{} does not fit in {}",
                n, target
            )));
        }
        Ok(match target {
            ValueType::TinyInt => Value::TinyInt(n as i8),
            ValueType::SmallInt => Value::SmallInt(n as i16),
            ValueType::Integer => Value::Integer(n as i32),
            ValueType::Timestamp => Value::Timestamp(n),
            _ => Value::BigInt(n),
        })
    }

    /// True when a non-null value has the bit pattern reserved for NULL.
    pub(crate) fn collides_with_null_sentinel(&self) -> bool {
        match self {
            Value::TinyInt(v) => *v == i8::MIN,
            Value::SmallInt(v) => *v == i16::MIN,
            Value::Integer(v) => *v == i32::MIN,
            Value::BigInt(v) | Value::Timestamp(v) => *v == i64::MIN,
            Value::Double(v) => *v == f64::MIN,
            _ => false,
        }
    }

    /// SQL comparison. Returns `Ok(None)` when either side is NULL.
    ///
    /// # Returns
    /// `Result<Option<Ordering>, DbError>` with the ordering, or a type
    /// mismatch when the values are not comparable.
    pub fn compare_sql(&self, other: &Value) -> Result<Option<Ordering>, DbError> {
        if self.is_null() || other.is_null() {
            return Ok(None);
        }
        if let (Some(a), Some(b)) = (self.as_i64(), other.as_i64()) {
            return Ok(Some(a.cmp(&b)));
        }
        if let (Some(a), Some(b)) = (self.as_f64(), other.as_f64()) {
            return Ok(a.partial_cmp(&b));
        }
        match (self, other) {
            (Value::Varchar(a), Value::Varchar(b)) | (Value::Varbinary(a), Value::Varbinary(b)) => {
                Ok(Some(a.as_bytes().cmp(b.as_bytes())))
            }
            _ => Err(DbError::TypeMismatch {
                expected: self.value_type().to_string(),
                got: other.value_type().to_string(),
            }),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null(_) => 0,
            Value::TinyInt(_) | Value::SmallInt(_) | Value::Integer(_) | Value::BigInt(_) => 1,
            Value::Timestamp(_) => 2,
            Value::Double(_) => 3,
            Value::Varchar(_) => 4,
            Value::Varbinary(_) => 5,
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_rank = self.rank().cmp(&other.rank());
        if by_rank != Ordering::Equal {
            return by_rank;
        }
        match (self, other) {
            (Value::Double(a), Value::Double(b)) => a.total_cmp(b),
            (Value::Varchar(a), Value::Varchar(b)) | (Value::Varbinary(a), Value::Varbinary(b)) => {
                a.as_bytes().cmp(b.as_bytes())
            }
            _ => self.as_i64().cmp(&other.as_i64()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Null(_) => {}
            Value::Double(d) => d.to_bits().hash(state),
            Value::Varchar(obj) | Value::Varbinary(obj) => obj.as_bytes().hash(state),
            other => other.as_i64().hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null(_) => f.write_str("NULL"),
            Value::Double(d) => write!(f, "{}", d),
            Value::Varchar(obj) => f.write_str(&String::from_utf8_lossy(obj.as_bytes())),
            Value::Varbinary(obj) => {
                for b in obj.as_bytes() {
                    write!(f, "{:02X}", b)?;
                }
                Ok(())
            }
            other => match other.as_i64() {
                Some(v) => write!(f, "{}", v),
                None => Ok(()),
            },
        }
    }
}
