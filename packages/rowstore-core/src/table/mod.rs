//! Tables: row storage, index maintenance, variants and iteration.

mod export;
mod iterator;
mod limits;
mod serialize;
#[allow(clippy::module_inception)]
mod table;
mod variant;

pub use export::{ExportBatch, ExportOp, ExportStream};
pub use iterator::{TableCursor, TableIterator};
pub use limits::TempTableLimits;
pub use table::Table;
pub use variant::{PersistentTable, StreamedTable, TableVariant, TempTable};
