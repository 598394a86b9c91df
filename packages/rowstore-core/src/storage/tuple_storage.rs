//! Block allocator for fixed-length tuples.
//!
//! Rows live in blocks of `tuples_per_block` slots. Freed slots are reused
//! most-recent-first, so storage order only matches insertion order until the
//! first delete.

use crate::error::DbError;

/// Target size of one storage block in bytes.
pub const TABLE_BLOCK_SIZE: usize = 2 * 1024 * 1024;

/// Stable slot address of a row within its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(usize);

impl RowId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Slot index in storage order.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Fixed-size block storage with slot occupancy tracking.
#[derive(Debug)]
pub struct TupleStorage {
    tuple_length: usize,
    tuples_per_block: usize,
    blocks: Vec<Vec<u8>>,
    occupied: Vec<bool>,
    free_slots: Vec<usize>,
    active_count: usize,
}

impl TupleStorage {
    /// Creates storage sized so one block holds about [`TABLE_BLOCK_SIZE`] bytes.
    ///
    /// # Panics
    /// Panics if `tuple_length` is 0.
    pub fn new(tuple_length: usize) -> Self {
        assert!(tuple_length > 0, "tuple_length must be > 0");
        Self::with_tuples_per_block(tuple_length, (TABLE_BLOCK_SIZE / tuple_length).max(1))
    }

    /// Creates storage with an explicit block capacity.
    ///
    /// # Panics
    /// Panics if `tuple_length` or `tuples_per_block` is 0.
    pub fn with_tuples_per_block(tuple_length: usize, tuples_per_block: usize) -> Self {
        assert!(tuple_length > 0, "tuple_length must be > 0");
        assert!(tuples_per_block > 0, "tuples_per_block must be > 0");
        Self {
            tuple_length,
            tuples_per_block,
            blocks: Vec::new(),
            occupied: Vec::new(),
            free_slots: Vec::new(),
            active_count: 0,
        }
    }

    pub fn tuple_length(&self) -> usize {
        self.tuple_length
    }

    pub fn tuples_per_block(&self) -> usize {
        self.tuples_per_block
    }

    /// Bytes allocated by one block.
    pub fn block_bytes(&self) -> usize {
        self.tuple_length * self.tuples_per_block
    }

    /// True when the next [`allocate`](Self::allocate) must add a block.
    pub fn needs_new_block(&self) -> bool {
        self.free_slots.is_empty() && self.occupied.len() == self.capacity()
    }

    /// Total slots across all blocks.
    pub fn capacity(&self) -> usize {
        self.blocks.len() * self.tuples_per_block
    }

    /// Claims a zeroed slot, reusing a freed one when available.
    ///
    /// # Returns
    /// `Result<RowId, DbError>` with the slot address, or `CapacityOverflow`.
    pub fn allocate(&mut self) -> Result<RowId, DbError> {
        if let Some(slot) = self.free_slots.pop() {
            self.occupied[slot] = true;
            self.active_count += 1;
            let row = RowId(slot);
            if let Some(data) = self.slot_mut(row) {
                data.fill(0);
            }
            return Ok(row);
        }

        if self.occupied.len() == self.capacity() {
            let block_bytes = self
                .tuple_length
                .checked_mul(self.tuples_per_block)
                .ok_or(DbError::CapacityOverflow {
                    operation: "tuple block allocation",
                })?;
            self.blocks.push(vec![0u8; block_bytes]);
        }

        let slot = self.occupied.len();
        self.occupied.push(true);
        self.active_count += 1;
        let row = RowId(slot);
        // Blocks kept by `clear(false)` still hold old rows.
        if let Some(data) = self.slot_mut(row) {
            data.fill(0);
        }
        Ok(row)
    }

    /// Releases a slot. Returns `false` if it was not active.
    pub fn free(&mut self, row: RowId) -> bool {
        match self.occupied.get_mut(row.0) {
            Some(active) if *active => {
                *active = false;
                self.free_slots.push(row.0);
                self.active_count -= 1;
                true
            }
            _ => false,
        }
    }

    pub fn is_active(&self, row: RowId) -> bool {
        self.occupied.get(row.0).copied().unwrap_or(false)
    }

    /// Row bytes of an active slot.
    pub fn tuple(&self, row: RowId) -> Option<&[u8]> {
        if !self.is_active(row) {
            return None;
        }
        let (block, start) = self.locate(row);
        self.blocks
            .get(block)
            .map(|b| &b[start..start + self.tuple_length])
    }

    /// Mutable row bytes of an active slot.
    pub fn tuple_mut(&mut self, row: RowId) -> Option<&mut [u8]> {
        if !self.is_active(row) {
            return None;
        }
        self.slot_mut(row)
    }

    fn slot_mut(&mut self, row: RowId) -> Option<&mut [u8]> {
        let (block, start) = self.locate(row);
        let len = self.tuple_length;
        self.blocks.get_mut(block).map(|b| &mut b[start..start + len])
    }

    fn locate(&self, row: RowId) -> (usize, usize) {
        (
            row.0 / self.tuples_per_block,
            (row.0 % self.tuples_per_block) * self.tuple_length,
        )
    }

    /// First active slot at or after `from`, in storage order.
    pub fn next_active(&self, from: usize) -> Option<RowId> {
        self.occupied
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, active)| **active)
            .map(|(slot, _)| RowId(slot))
    }

    /// Active slots in storage order.
    pub fn active_rows(&self) -> impl Iterator<Item = RowId> + '_ {
        self.occupied
            .iter()
            .enumerate()
            .filter(|(_, active)| **active)
            .map(|(slot, _)| RowId(slot))
    }

    pub fn active_count(&self) -> usize {
        self.active_count
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Bytes held by allocated blocks.
    pub fn allocated_bytes(&self) -> usize {
        self.blocks.len() * self.block_bytes()
    }

    /// Drops every row. Blocks are released when `release_blocks` is set,
    /// otherwise they stay allocated for reuse.
    pub fn clear(&mut self, release_blocks: bool) {
        self.occupied.clear();
        self.free_slots.clear();
        self.active_count = 0;
        if release_blocks {
            self.blocks.clear();
        }
    }
}
