//! Segment: one filer paired with one indexer.
//!
//! A segment owns a half-open offset range `[base_offset, next_offset)`.
//! Appends stamp the record with `next_offset`, frame it into the filer
//! and record `(next_offset - base_offset, position)` in the indexer.
//! Reads translate the absolute offset back through the indexer.
//!
//! A closed segment is read-only: its index snapshot has been persisted
//! and the filer handle released. Reads still work because the filer
//! reopens its handle lazily; appends are rejected.

use crate::config::LogConfig;
use crate::dir;
use crate::error::{LogError, LogResult};
use crate::indexer::Indexer;
use crate::record::Record;
use reclog_storage::{FileFiler, Filer};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// One filer plus one indexer under a base offset.
#[derive(Debug)]
pub struct Segment {
    base_offset: u64,
    next_offset: u64,
    config: LogConfig,
    filer: Arc<FileFiler>,
    indexer: Indexer,
    closed: bool,
}

impl Segment {
    /// Opens or creates the segment with the given base offset.
    ///
    /// `next_offset` is reconstructed from the index's latest entry; a
    /// fresh index means the segment starts at its base offset.
    ///
    /// # Errors
    ///
    /// Returns an error if either backing file cannot be opened or the
    /// index snapshot fails to decode.
    pub fn open(dir: &Path, base_offset: u64, config: LogConfig) -> LogResult<Self> {
        let filer = Arc::new(FileFiler::open(&dir::filer_path(dir, base_offset))?);
        let indexer = Indexer::open(dir::index_path(dir, base_offset))?;

        let next_offset = match indexer.read(None) {
            Ok((relative, _)) => base_offset + u64::from(relative) + 1,
            Err(LogError::EndOfStream) => base_offset,
            Err(err) => return Err(err),
        };
        debug!(base_offset, next_offset, "opened segment");

        Ok(Self {
            base_offset,
            next_offset,
            config,
            filer,
            indexer,
            closed: false,
        })
    }

    /// Appends a value and returns the absolute offset it was assigned.
    ///
    /// # Errors
    ///
    /// - [`LogError::SegmentClosed`] if the segment has been closed
    /// - [`LogError::EndOfStream`] if the segment is at capacity; the log
    ///   consumes this as the rollover signal
    pub fn append(&mut self, value: &[u8]) -> LogResult<u64> {
        if self.closed {
            return Err(LogError::SegmentClosed {
                base_offset: self.base_offset,
            });
        }
        if self.is_maxed() {
            return Err(LogError::EndOfStream);
        }

        let offset = self.next_offset;
        let record = Record {
            offset,
            value: value.to_vec(),
        };

        let (_, position) = self.filer.append(&record.encode())?;
        // Index slots are relative to the base offset; capacity is clamped
        // to u32::MAX so the difference always fits.
        self.indexer
            .write((offset - self.base_offset) as u32, position)?;

        self.next_offset += 1;
        Ok(offset)
    }

    /// Reads the record stored at an absolute offset.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::OffsetOutOfRange`] for offsets below the base,
    /// [`LogError::EndOfStream`] for offsets past the last entry, or the
    /// underlying index/filer/decode error.
    pub fn read(&self, offset: u64) -> LogResult<Record> {
        if offset < self.base_offset {
            return Err(LogError::OffsetOutOfRange { offset });
        }

        let (_, position) = self.indexer.read(Some((offset - self.base_offset) as u32))?;
        let payload = self.filer.read(position)?;
        Record::decode(&payload)
    }

    /// Returns whether the segment has reached its entry capacity.
    #[must_use]
    pub fn is_maxed(&self) -> bool {
        self.indexer.size() >= self.config.max_index_size
    }

    /// Returns the absolute offset of the segment's first record slot.
    #[must_use]
    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    /// Returns the absolute offset the next append would receive.
    #[must_use]
    pub fn next_offset(&self) -> u64 {
        self.next_offset
    }

    /// Returns whether the segment has been closed.
    #[must_use]
    pub fn closed(&self) -> bool {
        self.closed
    }

    /// Returns a handle to the segment's filer for streaming reads.
    #[must_use]
    pub fn filer(&self) -> Arc<FileFiler> {
        Arc::clone(&self.filer)
    }

    /// Persists the index snapshot and releases the filer handle.
    ///
    /// Idempotent. The segment remains readable afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot write or the filer sync fails.
    pub fn close(&mut self) -> LogResult<()> {
        if self.closed {
            return Ok(());
        }
        self.indexer.close()?;
        self.filer.close()?;
        self.closed = true;
        debug!(base_offset = self.base_offset, "closed segment");
        Ok(())
    }

    /// Closes the segment and deletes both backing files.
    ///
    /// # Errors
    ///
    /// Returns an error if closing or either deletion fails.
    pub fn remove(mut self) -> LogResult<()> {
        self.close()?;
        fs::remove_file(self.indexer.path())?;
        fs::remove_file(self.filer.path())?;
        debug!(base_offset = self.base_offset, "removed segment");
        Ok(())
    }
}
