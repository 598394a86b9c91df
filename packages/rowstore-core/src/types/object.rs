//! Reference-counted payloads for variable-length values.

use std::fmt;
use std::sync::Arc;

/// Identity of the object pool a payload was read from.
pub type PoolId = u64;

/// Immutable byte payload of a VARCHAR or VARBINARY value.
///
/// Clones share the same block. A payload read out of a table remembers the
/// pool it came from, so writing it back into that pool shares the block
/// while writing it into another table copies it.
#[derive(Clone)]
pub struct ObjectRef {
    data: Arc<[u8]>,
    pool: Option<PoolId>,
}

impl ObjectRef {
    /// Allocates a new payload not owned by any pool.
    pub fn new(bytes: &[u8]) -> Self {
        Self {
            data: Arc::from(bytes),
            pool: None,
        }
    }

    pub(crate) fn owned_by(&self, pool: PoolId) -> Self {
        Self {
            data: Arc::clone(&self.data),
            pool: Some(pool),
        }
    }

    /// Copies the bytes into a fresh block.
    pub fn deep_copy(&self) -> Self {
        Self::new(&self.data)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Pool this payload was read from, if any.
    pub fn pool(&self) -> Option<PoolId> {
        self.pool
    }

    /// True when both references point at the same block.
    pub fn shares_storage_with(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Number of live references to the block.
    pub fn reference_count(&self) -> usize {
        Arc::strong_count(&self.data)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(&self.data))
    }
}
