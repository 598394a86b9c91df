//! Scan executors.
//!
//! A [`ScanExecutor`] runs the shared per-row pipeline; the table-access part
//! is a [`ScanStrategy`] chosen from the plan node type.

mod scan;
mod strategy;

pub use scan::{AnyScanExecutor, ExecutorState, ScanExecutor, ScanRun};
pub use strategy::{IndexScan, ScanStrategy, SeqScan};
