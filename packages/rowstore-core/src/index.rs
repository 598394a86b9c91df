//! Table indexes.
//!
//! An index maps the projection of a row onto its key columns to the rows
//! holding that key. Unique indexes hold at most one row per key and refuse
//! a duplicate without changing anything.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DbError;
use crate::stats::IndexStats;
use crate::storage::RowId;
use crate::tuple::TupleRef;
use crate::types::Value;

/// Physical index structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndexType {
    /// Ordered; supports prefix and range lookups
    BalancedTree,
    /// Unordered; full-key equality only
    Hash,
}

/// Index definition handed to the table factory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableIndexScheme {
    pub name: String,
    pub index_type: IndexType,
    /// Key columns, in key order
    pub columns: Vec<usize>,
    pub unique: bool,
}

impl TableIndexScheme {
    pub fn new(name: impl Into<String>, index_type: IndexType, columns: Vec<usize>, unique: bool) -> Self {
        Self {
            name: name.into(),
            index_type,
            columns,
            unique,
        }
    }
}

/// Key of an index entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexKey(pub Vec<Value>);

impl IndexKey {
    pub fn values(&self) -> &[Value] {
        &self.0
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", v)?;
        }
        f.write_str(")")
    }
}

/// Comparison applied by an index lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LookupType {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl LookupType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "EQ" => Some(LookupType::Eq),
            "GT" => Some(LookupType::Gt),
            "GTE" => Some(LookupType::Gte),
            "LT" => Some(LookupType::Lt),
            "LTE" => Some(LookupType::Lte),
            _ => None,
        }
    }
}

#[derive(Debug)]
enum Entries {
    Tree(BTreeMap<IndexKey, Vec<RowId>>),
    Hash(HashMap<IndexKey, Vec<RowId>>),
}

/// Index over one table.
#[derive(Debug)]
pub struct TableIndex {
    scheme: TableIndexScheme,
    entries: Entries,
    entry_count: usize,
    stats: IndexStats,
}

impl TableIndex {
    pub fn new(scheme: TableIndexScheme) -> Self {
        let entries = match scheme.index_type {
            IndexType::BalancedTree => Entries::Tree(BTreeMap::new()),
            IndexType::Hash => Entries::Hash(HashMap::new()),
        };
        Self {
            scheme,
            entries,
            entry_count: 0,
            stats: IndexStats::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.scheme.name
    }

    pub fn scheme(&self) -> &TableIndexScheme {
        &self.scheme
    }

    pub fn is_unique_index(&self) -> bool {
        self.scheme.unique
    }

    pub fn index_type(&self) -> IndexType {
        self.scheme.index_type
    }

    pub fn column_indices(&self) -> &[usize] {
        &self.scheme.columns
    }

    /// Number of (key, row) entries.
    pub fn size(&self) -> usize {
        self.entry_count
    }

    pub fn get_index_stats(&self) -> &IndexStats {
        &self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut IndexStats {
        &mut self.stats
    }

    /// Projects a full row of values onto the key columns.
    pub fn key_from_values(&self, values: &[Value]) -> IndexKey {
        IndexKey(self.scheme.columns.iter().map(|&c| values[c].clone()).collect())
    }

    /// Projects a stored tuple onto the key columns.
    pub fn key_from_tuple(&self, tuple: &TupleRef<'_>) -> IndexKey {
        IndexKey(tuple.project(&self.scheme.columns))
    }

    fn rows(&self, key: &IndexKey) -> Option<&Vec<RowId>> {
        match &self.entries {
            Entries::Tree(map) => map.get(key),
            Entries::Hash(map) => map.get(key),
        }
    }

    /// True when at least one row holds `key`.
    pub fn exists(&self, key: &IndexKey) -> bool {
        self.rows(key).is_some_and(|rows| !rows.is_empty())
    }

    /// Rows holding exactly `key`.
    pub fn rows_for_key(&self, key: &IndexKey) -> &[RowId] {
        self.rows(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Adds an entry.
    ///
    /// # Returns
    /// `Result<(), DbError>`; a duplicate key on a unique index is a
    /// `UniqueViolation` and leaves the index unchanged.
    pub fn add_entry(&mut self, key: IndexKey, row: RowId, table: &str) -> Result<(), DbError> {
        if self.scheme.unique && self.exists(&key) {
            return Err(DbError::UniqueViolation {
                table: table.to_string(),
                index: self.scheme.name.clone(),
                key: key.to_string(),
            });
        }
        let rows = match &mut self.entries {
            Entries::Tree(map) => map.entry(key).or_default(),
            Entries::Hash(map) => map.entry(key).or_default(),
        };
        rows.push(row);
        self.entry_count += 1;
        Ok(())
    }

    /// Removes an entry. Returns `false` if it was not present.
    pub fn delete_entry(&mut self, key: &IndexKey, row: RowId) -> bool {
        let (removed, now_empty) = {
            let rows = match &mut self.entries {
                Entries::Tree(map) => map.get_mut(key),
                Entries::Hash(map) => map.get_mut(key),
            };
            match rows {
                Some(rows) => match rows.iter().position(|r| *r == row) {
                    Some(pos) => {
                        rows.swap_remove(pos);
                        (true, rows.is_empty())
                    }
                    None => (false, false),
                },
                None => (false, false),
            }
        };
        if now_empty {
            match &mut self.entries {
                Entries::Tree(map) => {
                    map.remove(key);
                }
                Entries::Hash(map) => {
                    map.remove(key);
                }
            }
        }
        if removed {
            self.entry_count -= 1;
        }
        removed
    }

    /// Finds rows whose key compares to `search` as `lookup` requires.
    ///
    /// `search` may be a prefix of the key on tree indexes; the comparison
    /// then applies to the leading key columns only. Hash indexes support
    /// full-key `Eq` lookups. Results follow key order on tree indexes.
    pub fn lookup(&self, lookup: LookupType, search: &[Value]) -> Result<Vec<RowId>, DbError> {
        if search.len() > self.scheme.columns.len() {
            return Err(DbError::TypeMismatch {
                expected: format!("at most {} key values", self.scheme.columns.len()),
                got: format!("{} key values", search.len()),
            });
        }
        match &self.entries {
            Entries::Hash(map) => {
                if lookup != LookupType::Eq || search.len() != self.scheme.columns.len() {
                    return Err(DbError::UnsupportedOperation {
                        table: self.scheme.name.clone(),
                        operation: "hash index range or prefix lookup",
                    });
                }
                Ok(map
                    .get(&IndexKey(search.to_vec()))
                    .cloned()
                    .unwrap_or_default())
            }
            Entries::Tree(map) => {
                let n = search.len();
                let prefix = |key: &IndexKey| key.0[..n].cmp(search);
                let start = IndexKey(search.to_vec());
                let keys: Vec<&Vec<RowId>> = match lookup {
                    LookupType::Eq => map
                        .range(start..)
                        .take_while(|(k, _)| prefix(*k).is_eq())
                        .map(|(_, rows)| rows)
                        .collect(),
                    LookupType::Gte => map.range(start..).map(|(_, rows)| rows).collect(),
                    LookupType::Gt => map
                        .range(start..)
                        .skip_while(|(k, _)| prefix(*k).is_eq())
                        .map(|(_, rows)| rows)
                        .collect(),
                    LookupType::Lt => map
                        .iter()
                        .take_while(|(k, _)| prefix(*k).is_lt())
                        .map(|(_, rows)| rows)
                        .collect(),
                    LookupType::Lte => map
                        .iter()
                        .take_while(|(k, _)| prefix(*k).is_le())
                        .map(|(_, rows)| rows)
                        .collect(),
                };
                Ok(keys.into_iter().flatten().copied().collect())
            }
        }
    }

    /// Every row in key order (tree) or arbitrary order (hash).
    pub fn all_rows(&self) -> Vec<RowId> {
        match &self.entries {
            Entries::Tree(map) => map.values().flatten().copied().collect(),
            Entries::Hash(map) => map.values().flatten().copied().collect(),
        }
    }

    pub fn clear(&mut self) {
        match &mut self.entries {
            Entries::Tree(map) => map.clear(),
            Entries::Hash(map) => map.clear(),
        }
        self.entry_count = 0;
    }
}
