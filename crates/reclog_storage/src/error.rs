//! Error types for filer operations.

use std::io;
use thiserror::Error;

/// Result type for filer operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during filer operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Attempted to read beyond the end of the filer.
    #[error("read beyond end of filer: offset {offset}, len {len}, size {size}")]
    ReadPastEnd {
        /// The requested read offset.
        offset: u64,
        /// The requested read length.
        len: usize,
        /// The current filer size.
        size: u64,
    },
}
