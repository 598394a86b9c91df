//! Variant-specific table state.

use std::sync::Arc;

use super::export::ExportStream;
use super::limits::TempTableLimits;

/// Durable table of the partition.
#[derive(Debug)]
pub struct PersistentTable {
    /// Column used to route rows to partitions
    pub partition_column: Option<usize>,
    pub export_enabled: bool,
    pub(crate) export: Option<ExportStream>,
}

impl PersistentTable {
    pub(crate) fn new(partition_column: Option<usize>, export_enabled: bool) -> Self {
        Self {
            partition_column,
            export_enabled,
            export: export_enabled.then(ExportStream::new),
        }
    }
}

/// Intermediate result table, charged against shared limits.
#[derive(Debug)]
pub struct TempTable {
    pub(crate) limits: Option<Arc<TempTableLimits>>,
    pub(crate) charged: usize,
}

impl TempTable {
    pub(crate) fn new(limits: Option<Arc<TempTableLimits>>) -> Self {
        Self { limits, charged: 0 }
    }

    pub fn limits(&self) -> Option<&Arc<TempTableLimits>> {
        self.limits.as_ref()
    }

    pub(crate) fn charge(&mut self, bytes: usize, table: &str) -> Result<(), crate::error::DbError> {
        if bytes == 0 {
            return Ok(());
        }
        if let Some(limits) = &self.limits {
            limits.reserve(bytes, table)?;
        }
        self.charged += bytes;
        Ok(())
    }

    pub(crate) fn refund(&mut self, bytes: usize) {
        let bytes = bytes.min(self.charged);
        if let Some(limits) = &self.limits {
            limits.release(bytes);
        }
        self.charged -= bytes;
    }
}

impl Drop for TempTable {
    fn drop(&mut self) {
        if let Some(limits) = &self.limits {
            limits.release(self.charged);
        }
    }
}

/// Export-only table; rows are forwarded and never retained.
#[derive(Debug, Default)]
pub struct StreamedTable {
    pub(crate) stream: ExportStream,
}

/// The closed set of table variants.
#[derive(Debug)]
pub enum TableVariant {
    Persistent(PersistentTable),
    Temp(TempTable),
    Streamed(StreamedTable),
}

impl TableVariant {
    /// Variant name used in logs and errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            TableVariant::Persistent(_) => "PersistentTable",
            TableVariant::Temp(_) => "TempTable",
            TableVariant::Streamed(_) => "StreamedTable",
        }
    }
}
