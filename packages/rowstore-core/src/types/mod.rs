//! Column value types, values and out-of-line object payloads.

mod object;
mod value;
mod value_type;

pub use object::{ObjectRef, PoolId};
pub use value::Value;
pub use value_type::ValueType;

/// Largest declared size accepted for a variable-length column.
pub const MAX_VARIABLE_LENGTH: usize = 1024 * 1024;

/// Variable-length columns declared shorter than this are stored inline.
pub const UNINLINEABLE_OBJECT_LENGTH: usize = 64;
