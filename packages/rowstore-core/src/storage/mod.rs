//! Physical tuple storage: fixed-size row blocks and the out-of-line object pool.

mod object_pool;
mod tuple_storage;

pub use object_pool::{ObjectPool, NULL_OBJECT_HANDLE};
pub use tuple_storage::{RowId, TupleStorage, TABLE_BLOCK_SIZE};
