//! Per-table storage for out-of-line variable-length payloads.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::DbError;
use crate::types::{ObjectRef, PoolId};

/// Handle value stored in a row for a NULL out-of-line column.
pub const NULL_OBJECT_HANDLE: u32 = u32::MAX;

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// Slab of payloads addressed by 4-byte handles.
#[derive(Debug)]
pub struct ObjectPool {
    id: PoolId,
    slots: Vec<Option<ObjectRef>>,
    free: Vec<u32>,
    allocated_bytes: usize,
}

impl Default for ObjectPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectPool {
    pub fn new() -> Self {
        Self {
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            slots: Vec::new(),
            free: Vec::new(),
            allocated_bytes: 0,
        }
    }

    pub fn id(&self) -> PoolId {
        self.id
    }

    /// Stores a payload and returns its handle.
    ///
    /// A payload read from this pool shares its block; anything else is
    /// copied so this pool never aliases another table's storage.
    pub fn store(&mut self, object: &ObjectRef) -> Result<u32, DbError> {
        let stored = if object.pool() == Some(self.id) {
            object.clone()
        } else {
            object.deep_copy().owned_by(self.id)
        };
        let len = stored.len();

        let handle = match self.free.pop() {
            Some(handle) => {
                self.slots[handle as usize] = Some(stored);
                handle
            }
            None => {
                let handle = u32::try_from(self.slots.len())
                    .ok()
                    .filter(|h| *h != NULL_OBJECT_HANDLE)
                    .ok_or(DbError::CapacityOverflow {
                        operation: "object handle allocation",
                    })?;
                self.slots.push(Some(stored));
                handle
            }
        };
        self.allocated_bytes += len;
        Ok(handle)
    }

    pub fn get(&self, handle: u32) -> Option<&ObjectRef> {
        self.slots.get(handle as usize).and_then(Option::as_ref)
    }

    /// Drops a handle. Returns the payload size released.
    pub fn release(&mut self, handle: u32) -> usize {
        match self.slots.get_mut(handle as usize).and_then(Option::take) {
            Some(object) => {
                self.free.push(handle);
                self.allocated_bytes -= object.len();
                object.len()
            }
            None => 0,
        }
    }

    /// Live handles.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Payload bytes referenced by live handles.
    pub fn allocated_bytes(&self) -> usize {
        self.allocated_bytes
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.allocated_bytes = 0;
    }
}
