//! Memory accounting shared by the temp tables of one plan fragment.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::config::DbConfig;
use crate::error::DbError;

/// Memory budget for intermediate results.
#[derive(Debug)]
pub struct TempTableLimits {
    memory_limit: usize,
    log_threshold: usize,
    allocated: AtomicUsize,
    peak: AtomicUsize,
    logged: AtomicBool,
}

impl TempTableLimits {
    pub fn new(memory_limit: usize, log_threshold: usize) -> Self {
        Self {
            memory_limit,
            log_threshold,
            allocated: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            logged: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &DbConfig) -> Self {
        Self::new(config.temp_table_memory_limit, config.temp_table_log_threshold)
    }

    /// Charges `bytes` against the budget.
    ///
    /// # Returns
    /// `Result<(), DbError>`; `MemoryLimitExceeded` leaves the budget unchanged.
    pub fn reserve(&self, bytes: usize, table: &str) -> Result<(), DbError> {
        let current = self.allocated.load(Ordering::Acquire);
        let next = current.checked_add(bytes).ok_or(DbError::CapacityOverflow {
            operation: "temp table memory accounting",
        })?;
        if next > self.memory_limit {
            return Err(DbError::MemoryLimitExceeded {
                requested: next,
                limit: self.memory_limit,
                table: table.to_string(),
            });
        }
        self.allocated.fetch_add(bytes, Ordering::AcqRel);
        self.peak.fetch_max(next, Ordering::AcqRel);

        if next >= self.log_threshold && !self.logged.swap(true, Ordering::AcqRel) {
            tracing::warn!(
                "Temp table '{}' pushed fragment memory to {} bytes (threshold {}, limit {})",
                table,
                next,
                self.log_threshold,
                self.memory_limit
            );
        }
        Ok(())
    }

    /// Returns `bytes` to the budget.
    pub fn release(&self, bytes: usize) {
        let _ = self
            .allocated
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_sub(bytes))
            });
    }

    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::Acquire)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }

    pub fn memory_limit(&self) -> usize {
        self.memory_limit
    }
}
