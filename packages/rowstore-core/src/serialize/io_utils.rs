//! I/O error classification for the file transport.

use std::io::ErrorKind;

use crate::error::DbError;

/// Classifies I/O errors into specific DbError variants.
///
/// Nothing here is retried: a failed or stalled write surfaces to the caller.
pub fn classify_io_error(error: std::io::Error, context: &str) -> DbError {
    match error.kind() {
        ErrorKind::StorageFull | ErrorKind::OutOfMemory => {
            DbError::DiskFull(format!("{}: {}", context, error))
        }
        ErrorKind::UnexpectedEof => DbError::Deserialization(format!("{}: {}", context, error)),
        _ => DbError::IoError(format!("{}: {}", context, error)),
    }
}
