//! The log manager: segment list, routing, rollover and recovery.

use crate::config::LogConfig;
use crate::dir;
use crate::error::{LogError, LogResult};
use crate::record::Record;
use crate::segment::Segment;
use parking_lot::{Mutex, RwLock};
use reclog_storage::Filer;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// An append-only, segmented record log.
///
/// The log owns an ordered list of segments; the last one is *active* and
/// receives appends. When the active segment reaches its entry capacity,
/// the log closes it and opens a new one at the next offset.
///
/// All operations take `&self` and are thread-safe: appends and structural
/// changes serialize on a write lock, reads share a read lock.
///
/// # Example
///
/// ```no_run
/// use reclog_core::{Log, LogConfig};
///
/// let log = Log::open("orders-log", LogConfig::new().max_index_size(1024)).unwrap();
/// let offset = log.append(b"hello world").unwrap();
/// assert_eq!(log.read(offset).unwrap().value, b"hello world");
/// ```
pub struct Log {
    dir: PathBuf,
    config: LogConfig,
    /// Advisory directory lock, held for the life of the log.
    dir_lock: Mutex<File>,
    segments: RwLock<Vec<Segment>>,
}

impl Log {
    /// Opens a log bound to a directory, creating it if needed.
    ///
    /// Existing segments are recovered in ascending base-offset order; an
    /// empty directory starts one segment at the configured initial
    /// offset. The directory is exclusive to this instance until the log
    /// is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::DirectoryLocked`] if another instance holds the
    /// directory, or an error if recovery fails.
    pub fn open(dir: impl AsRef<Path>, config: LogConfig) -> LogResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        let config = config.normalized();

        fs::create_dir_all(&dir)?;
        let dir_lock = dir::lock_directory(&dir)?;
        let segments = Self::load_segments(&dir, config)?;
        info!(dir = %dir.display(), segments = segments.len(), "log opened");

        Ok(Self {
            dir,
            config,
            dir_lock: Mutex::new(dir_lock),
            segments: RwLock::new(segments),
        })
    }

    fn load_segments(dir: &Path, config: LogConfig) -> LogResult<Vec<Segment>> {
        let base_offsets = dir::list_base_offsets(dir)?;

        let mut segments: Vec<Segment> = Vec::with_capacity(base_offsets.len().max(1));
        for base_offset in base_offsets {
            // The segment being left behind stops receiving appends; close
            // it so its index snapshot is persisted.
            if let Some(previous) = segments.last_mut() {
                previous.close()?;
            }
            segments.push(Segment::open(dir, base_offset, config)?);
        }

        if segments.is_empty() {
            debug!(
                initial_offset = config.initial_offset,
                "initializing empty log"
            );
            segments.push(Segment::open(dir, config.initial_offset, config)?);
        }
        Ok(segments)
    }

    /// Appends a value and returns the absolute offset it was assigned.
    ///
    /// Offsets are assigned strictly monotonically. A maxed active segment
    /// is closed and replaced before the append lands.
    ///
    /// # Errors
    ///
    /// Returns an error if the filer write, index update or rollover
    /// fails.
    pub fn append(&self, value: &[u8]) -> LogResult<u64> {
        let mut segments = self.segments.write();

        match Self::append_active(&mut segments, value) {
            Err(LogError::EndOfStream) => {
                self.roll_over(&mut segments)?;
                Self::append_active(&mut segments, value)
            }
            result => result,
        }
    }

    fn append_active(segments: &mut [Segment], value: &[u8]) -> LogResult<u64> {
        match segments.last_mut() {
            Some(active) => active.append(value),
            None => Err(LogError::EndOfStream),
        }
    }

    /// Closes the active segment and promotes a fresh one.
    fn roll_over(&self, segments: &mut Vec<Segment>) -> LogResult<()> {
        let next_base = match segments.last_mut() {
            Some(active) => {
                let base = active.next_offset();
                active.close()?;
                base
            }
            None => self.config.initial_offset,
        };

        debug!(base_offset = next_base, "rolling over to new active segment");
        segments.push(Segment::open(&self.dir, next_base, self.config)?);
        Ok(())
    }

    /// Reads the record stored at an absolute offset.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::OffsetOutOfRange`] if no segment holds the
    /// offset, or the underlying read/decode error.
    pub fn read(&self, offset: u64) -> LogResult<Record> {
        let segments = self.segments.read();

        let segment = segments
            .iter()
            .find(|segment| segment.base_offset() <= offset && offset < segment.next_offset())
            .ok_or(LogError::OffsetOutOfRange { offset })?;
        segment.read(offset)
    }

    /// Returns the lowest offset held by the log.
    #[must_use]
    pub fn lowest_offset(&self) -> u64 {
        let segments = self.segments.read();
        segments
            .first()
            .map_or(self.config.initial_offset, Segment::base_offset)
    }

    /// Returns the highest offset held by the log, or 0 when empty.
    #[must_use]
    pub fn highest_offset(&self) -> u64 {
        let segments = self.segments.read();
        let next_offset = segments.last().map_or(0, Segment::next_offset);
        next_offset.saturating_sub(1)
    }

    /// Removes every segment whose entire offset range is at or below
    /// `lowest`.
    ///
    /// Truncation is segment-grained: a segment survives unless
    /// `next_offset <= lowest + 1`. If every segment qualifies, a fresh
    /// empty segment is opened at the previous next offset, so the offset
    /// sequence continues uninterrupted.
    ///
    /// # Errors
    ///
    /// Returns an error if deleting a segment's files fails.
    pub fn truncate(&self, lowest: u64) -> LogResult<()> {
        let mut segments = self.segments.write();

        let next_base = segments
            .last()
            .map_or(self.config.initial_offset, Segment::next_offset);

        let all = std::mem::take(&mut *segments);
        for segment in all {
            if segment.next_offset() <= lowest.saturating_add(1) {
                debug!(
                    base_offset = segment.base_offset(),
                    lowest, "truncating segment"
                );
                segment.remove()?;
            } else {
                segments.push(segment);
            }
        }

        if segments.is_empty() {
            debug!(base_offset = next_base, "truncation emptied the log");
            segments.push(Segment::open(&self.dir, next_base, self.config)?);
        }
        Ok(())
    }

    /// Returns a reader over the raw framed byte log.
    ///
    /// The stream concatenates each segment's filer content in segment
    /// order, starting at byte 0. Consumers parse the 8-byte big-endian
    /// length-prefix framing themselves. The segment list is snapshotted
    /// at construction; truncating while a reader is alive leaves the
    /// stream contents undefined.
    #[must_use]
    pub fn reader(&self) -> LogReader {
        let segments = self.segments.read();

        let filers = segments
            .iter()
            .map(|segment| segment.filer() as Arc<dyn Filer>)
            .collect();
        LogReader {
            filers,
            current: 0,
            position: 0,
        }
    }

    /// Closes every segment, persisting all index snapshots.
    ///
    /// # Errors
    ///
    /// Returns an error if a segment fails to close.
    pub fn close(&self) -> LogResult<()> {
        let mut segments = self.segments.write();
        Self::close_all(&mut segments)
    }

    fn close_all(segments: &mut [Segment]) -> LogResult<()> {
        for segment in segments.iter_mut() {
            if !segment.closed() {
                segment.close()?;
            }
        }
        Ok(())
    }

    /// Closes the log and deletes its directory tree.
    ///
    /// # Errors
    ///
    /// Returns an error if closing or the deletion fails.
    pub fn remove(&self) -> LogResult<()> {
        let mut segments = self.segments.write();
        Self::close_all(&mut segments)?;
        segments.clear();
        fs::remove_dir_all(&self.dir)?;
        info!(dir = %self.dir.display(), "log removed");
        Ok(())
    }

    /// Removes the log and reinitializes it empty.
    ///
    /// # Errors
    ///
    /// Returns an error if removal or reinitialization fails.
    pub fn reset(&self) -> LogResult<()> {
        let mut segments = self.segments.write();
        Self::close_all(&mut segments)?;
        segments.clear();
        fs::remove_dir_all(&self.dir)?;

        fs::create_dir_all(&self.dir)?;
        *self.dir_lock.lock() = dir::lock_directory(&self.dir)?;
        *segments = Self::load_segments(&self.dir, self.config)?;
        info!(dir = %self.dir.display(), "log reset");
        Ok(())
    }

    /// Returns the log's directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.dir
    }

    /// Returns the log's resolved configuration.
    #[must_use]
    pub fn config(&self) -> LogConfig {
        self.config
    }
}

impl std::fmt::Debug for Log {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Log")
            .field("dir", &self.dir)
            .field("config", &self.config)
            .field("segments", &self.segments.read().len())
            .finish_non_exhaustive()
    }
}

/// Sequential reader over the concatenated filer bytes of a log.
///
/// Created by [`Log::reader`]. Holds its own handles to the segment
/// filers, so the stream stays readable after segments are closed.
pub struct LogReader {
    filers: Vec<Arc<dyn Filer>>,
    current: usize,
    position: u64,
}

impl io::Read for LogReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while let Some(filer) = self.filers.get(self.current) {
            let n = filer
                .read_at(buf, self.position)
                .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
            if n > 0 {
                self.position += n as u64;
                return Ok(n);
            }
            self.current += 1;
            self.position = 0;
        }
        Ok(0)
    }
}
