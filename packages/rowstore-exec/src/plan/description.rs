//! Typed access to JSON plan descriptions.
//!
//! Plan nodes and expressions are loaded only through [`PlanObject`], so raw
//! `serde_json` handling stays in this file. A required key that is absent,
//! or present as JSON `null`, fails with `MissingPlanField` naming the key.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};

use rowstore_core::error::DbError;

/// Returns a string representation of a JSON value's type.
fn json_type(v: &JsonValue) -> &'static str {
    match v {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Borrowed view of one JSON object in a plan description.
#[derive(Debug, Clone, Copy)]
pub struct PlanObject<'a> {
    /// Label used in error messages, e.g. `"SeqScanPlanNode"`
    node: &'a str,
    obj: &'a Map<String, JsonValue>,
}

impl<'a> PlanObject<'a> {
    /// Wraps `value`, which must be a JSON object.
    pub fn from_value(node: &'a str, value: &'a JsonValue) -> Result<Self, DbError> {
        match value {
            JsonValue::Object(obj) => Ok(Self { node, obj }),
            other => Err(DbError::MalformedPlan(format!(
                "{}: expected an object, got {}",
                node,
                json_type(other)
            ))),
        }
    }

    pub fn node(&self) -> &'a str {
        self.node
    }

    /// Same object reported under another label.
    pub fn relabel(self, node: &'a str) -> Self {
        Self { node, ..self }
    }

    /// Value of `key`, treating JSON `null` as absent.
    pub fn get(&self, key: &str) -> Option<&'a JsonValue> {
        self.obj.get(key).filter(|v| !v.is_null())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn require(&self, key: &str) -> Result<&'a JsonValue, DbError> {
        self.get(key).ok_or_else(|| DbError::MissingPlanField {
            node: self.node.to_string(),
            key: key.to_string(),
        })
    }

    fn malformed(&self, key: &str, expected: &str, got: &JsonValue) -> DbError {
        DbError::MalformedPlan(format!(
            "{}: {} should be {}, got {}",
            self.node,
            key,
            expected,
            json_type(got)
        ))
    }

    fn as_i64(&self, key: &str, value: &'a JsonValue) -> Result<i64, DbError> {
        match value {
            JsonValue::Number(n) => n.as_i64().ok_or_else(|| self.malformed(key, "an integer", value)),
            // Planner output sometimes quotes numbers.
            JsonValue::String(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| self.malformed(key, "an integer", value)),
            _ => Err(self.malformed(key, "an integer", value)),
        }
    }

    pub fn require_i64(&self, key: &str) -> Result<i64, DbError> {
        let value = self.require(key)?;
        self.as_i64(key, value)
    }

    pub fn optional_i64(&self, key: &str) -> Result<Option<i64>, DbError> {
        self.get(key).map(|v| self.as_i64(key, v)).transpose()
    }

    /// Reads a non-negative integer as an index.
    pub fn require_index(&self, key: &str) -> Result<usize, DbError> {
        let n = self.require_i64(key)?;
        usize::try_from(n).map_err(|_| {
            DbError::MalformedPlan(format!("{}: {} must not be negative, got {}", self.node, key, n))
        })
    }

    pub fn require_str(&self, key: &str) -> Result<&'a str, DbError> {
        let value = self.require(key)?;
        value.as_str().ok_or_else(|| self.malformed(key, "a string", value))
    }

    pub fn optional_str(&self, key: &str) -> Result<Option<&'a str>, DbError> {
        self.get(key)
            .map(|v| v.as_str().ok_or_else(|| self.malformed(key, "a string", v)))
            .transpose()
    }

    pub fn require_array(&self, key: &str) -> Result<&'a [JsonValue], DbError> {
        let value = self.require(key)?;
        value
            .as_array()
            .map(Vec::as_slice)
            .ok_or_else(|| self.malformed(key, "an array", value))
    }

    /// Array under `key`; an absent key reads as empty.
    pub fn optional_array(&self, key: &str) -> Result<&'a [JsonValue], DbError> {
        match self.get(key) {
            Some(v) => v
                .as_array()
                .map(Vec::as_slice)
                .ok_or_else(|| self.malformed(key, "an array", v)),
            None => Ok(&[]),
        }
    }

    /// Nested object under `key`, reported under this object's label.
    pub fn require_object(&self, key: &str) -> Result<PlanObject<'a>, DbError> {
        Self::from_value(self.node, self.require(key)?)
    }

    pub fn optional_object(&self, key: &str) -> Result<Option<PlanObject<'a>>, DbError> {
        self.get(key).map(|v| Self::from_value(self.node, v)).transpose()
    }

    /// Decodes `key` into a serde type, typically a string enum.
    pub fn require_parsed<T: DeserializeOwned>(&self, key: &str) -> Result<T, DbError> {
        let value = self.require(key)?;
        serde_json::from_value(value.clone()).map_err(|e| {
            DbError::MalformedPlan(format!("{}: invalid {}: {}", self.node, key, e))
        })
    }

    pub fn optional_parsed<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, DbError> {
        if self.contains(key) {
            self.require_parsed(key).map(Some)
        } else {
            Ok(None)
        }
    }
}
