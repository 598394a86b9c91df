//! Integration tests for the storage engine.
//!
//! 1. Serialization through buffer and file transports
//! 2. Table factory wiring
//! 3. Snapshot and restore through the database registry

pub mod factory_tests;
pub mod helpers;
pub mod serialization_tests;
pub mod snapshot_tests;
