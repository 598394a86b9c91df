//! Engine configuration.

use std::path::PathBuf;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Memory limit shared by the temp tables of one plan fragment, in bytes
    pub temp_table_memory_limit: usize,
    /// Allocation level at which temp table usage is logged, in bytes
    pub temp_table_log_threshold: usize,
    /// Buffer size of the file transport, in bytes
    pub io_buffer_size: usize,
    /// Directory for table snapshots
    pub data_dir: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            temp_table_memory_limit: 100 * 1024 * 1024, // 100 MiB
            temp_table_log_threshold: 50 * 1024 * 1024, // 50 MiB
            io_buffer_size: 64 * 1024,
            data_dir: PathBuf::from("./data"),
        }
    }
}
