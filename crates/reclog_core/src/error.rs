//! Error types for the log engine.

use std::io;
use thiserror::Error;

/// Result type for log operations.
pub type LogResult<T> = Result<T, LogError>;

/// Errors that can occur in log engine operations.
#[derive(Debug, Error)]
pub enum LogError {
    /// Filer storage error.
    #[error("storage error: {0}")]
    Storage(#[from] reclog_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The requested offset is not held by any segment.
    #[error("requested offset is outside the log's range: {offset}")]
    OffsetOutOfRange {
        /// The offset that was requested.
        offset: u64,
    },

    /// The index was asked to record an already-present relative offset.
    #[error("relative offset {offset} already present in index")]
    DuplicateOffset {
        /// The relative offset that was rejected.
        offset: u32,
    },

    /// An index lookup resolved to no recorded position.
    #[error("no position recorded for relative offset {offset}")]
    RecordPosition {
        /// The relative offset that had no mapping.
        offset: u32,
    },

    /// Read past the last index entry, or append to a maxed segment.
    ///
    /// This is an internal signal: a fresh index reports it so the segment
    /// initializes `next_offset` from its base offset, and a maxed segment
    /// reports it so the log rolls over to a new active segment.
    #[error("end of stream")]
    EndOfStream,

    /// A record envelope could not be decoded.
    #[error("record decode failed: {message}")]
    RecordCorrupted {
        /// Description of the decode failure.
        message: String,
    },

    /// An index snapshot could not be decoded.
    #[error("index snapshot corrupted: {message}")]
    SnapshotCorrupted {
        /// Description of the corruption.
        message: String,
    },

    /// Append was attempted on a closed segment.
    #[error("segment {base_offset} is closed for appends")]
    SegmentClosed {
        /// Base offset of the closed segment.
        base_offset: u64,
    },

    /// Another log instance holds the directory's advisory lock.
    #[error("log directory locked: another log instance has exclusive access")]
    DirectoryLocked,
}

impl LogError {
    /// Creates a record corruption error.
    pub fn record_corrupted(message: impl Into<String>) -> Self {
        Self::RecordCorrupted {
            message: message.into(),
        }
    }

    /// Creates an index snapshot corruption error.
    pub fn snapshot_corrupted(message: impl Into<String>) -> Self {
        Self::SnapshotCorrupted {
            message: message.into(),
        }
    }
}
