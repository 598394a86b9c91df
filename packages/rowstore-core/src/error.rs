//! Engine error types.

use thiserror::Error;

/// Storage, serialization and execution errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DbError {
    /// Schema construction rejected the column descriptors
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// Table not found
    #[error("Table '{table}' not found")]
    TableNotFound { table: String },

    /// Table already exists
    #[error("Table '{0}' already exists")]
    TableAlreadyExists(String),

    /// Column index past the end of the schema
    #[error("Column {column} out of range for table '{table}' ({count} columns)")]
    ColumnOutOfRange {
        table: String,
        column: usize,
        count: usize,
    },

    /// Type mismatch error
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    /// NULL written to a NOT NULL column
    #[error("Column '{column}' of table '{table}' does not allow NULL")]
    NullViolation { table: String, column: String },

    /// Value collides with a NULL sentinel or does not fit the target type
    #[error("Value out of range: {0}")]
    ValueOutOfRange(String),

    /// Variable-length value longer than its declared size
    #[error("Value of {length} bytes exceeds declared size {max} of column '{column}'")]
    ValueTooLong {
        column: String,
        length: usize,
        max: usize,
    },

    /// Duplicate key on a unique index
    #[error("Unique constraint violation on index '{index}' of table '{table}' for key {key}")]
    UniqueViolation {
        table: String,
        index: String,
        key: String,
    },

    /// Capacity calculation overflow
    #[error("Capacity overflow during {operation}")]
    CapacityOverflow { operation: &'static str },

    /// Memory limit exceeded for tuple or object storage
    #[error("Memory limit exceeded for table '{table}': requested {requested} bytes, limit {limit} bytes")]
    MemoryLimitExceeded {
        requested: usize,
        limit: usize,
        table: String,
    },

    /// Row not found
    #[error("Row {row} not found in table '{table}'")]
    RowNotFound { table: String, row: usize },

    /// Operation not available on this table variant
    #[error("Operation '{operation}' is not supported by table '{table}'")]
    UnsupportedOperation {
        table: String,
        operation: &'static str,
    },

    /// Encoded schema differs from the destination table schema
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Malformed table stream
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Stream ended before a value could be read
    #[error("Truncated stream: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    /// Disk full error during a file write
    #[error("Disk full: {0}")]
    DiskFull(String),

    /// I/O error during a file transport operation
    #[error("I/O error: {0}")]
    IoError(String),

    /// Required key absent from a plan description
    #[error("{node}: can't find {key} value")]
    MissingPlanField { node: String, key: String },

    /// Plan description present but not shaped as expected
    #[error("Malformed plan: {0}")]
    MalformedPlan(String),

    /// Executor could not bind its plan node
    #[error("Initialization error: {0}")]
    Initialization(String),

    /// Expression evaluation failure
    #[error("Expression error: {0}")]
    Expression(String),
}
