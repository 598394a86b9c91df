//! Plan-node loading and scan execution over rowstore tables.
//!
//! Plan descriptions arrive as JSON and are read only through
//! [`plan::PlanObject`]. Loaded scan nodes run in a
//! [`executor::ScanExecutor`], which applies the predicate, offset, limit
//! and projection to the candidates of its strategy.

pub mod executor;
pub mod expression;
pub mod plan;

pub use rowstore_core::DbError;

/// Result type for plan loading and execution.
pub type Result<T> = std::result::Result<T, DbError>;
