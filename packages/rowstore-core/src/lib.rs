//! Core storage engine of a partitioned in-memory relational database.
//!
//! Provides tuple schemas, row storage with out-of-line objects, tables with
//! unique and secondary indexes, the table factory, and the binary table
//! serialization format with buffer and file transports.

pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod factory;
pub mod index;
pub mod schema;
pub mod serialize;
pub mod stats;
pub mod storage;
pub mod table;
pub mod tuple;
pub mod types;

pub use error::DbError;

/// Result type used throughout the engine.
pub type Result<T> = std::result::Result<T, DbError>;
