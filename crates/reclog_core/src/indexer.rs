//! Offset-to-position index with durable snapshots.
//!
//! The indexer maps a segment-relative offset (u32, dense from 0) to the
//! byte position of the record's frame in the segment's filer. The mapping
//! lives in memory; persistence is a whole-map snapshot written when the
//! segment closes, not a per-entry log.
//!
//! ## Snapshot Format
//!
//! ```text
//! | magic "RLIX" (4) | version u16 LE (2) | count u32 LE (4) |
//! | entry* : rel_offset u32 LE (4) + position u64 LE (8)     |
//! ```
//!
//! Entries are emitted in ascending key order so the encoding is
//! deterministic. The snapshot is replaced atomically (temp file, fsync,
//! rename, directory fsync); a crash before close loses index updates
//! since the last open, which recovery tolerates.

use crate::dir;
use crate::error::{LogError, LogResult};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Magic bytes identifying an index snapshot.
const INDEX_MAGIC: [u8; 4] = *b"RLIX";

/// Current index snapshot format version.
const INDEX_VERSION: u16 = 1;

/// Snapshot header size: magic (4) + version (2) + count (4).
const HEADER_SIZE: usize = 10;

/// Size of one encoded entry: relative offset (4) + position (8).
const ENTRY_SIZE: usize = 12;

/// Dense map from relative offset to filer byte position.
#[derive(Debug)]
pub struct Indexer {
    path: PathBuf,
    entries: Mutex<BTreeMap<u32, u64>>,
}

impl Indexer {
    /// Opens or creates the index backing file at `path`.
    ///
    /// A non-empty file is decoded as a snapshot; an empty or missing file
    /// yields a fresh index.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or created, or if a
    /// non-empty snapshot fails to decode.
    pub fn open(path: PathBuf) -> LogResult<Self> {
        if !path.exists() {
            File::create(&path)?;
        }

        let data = fs::read(&path)?;
        let entries = if data.is_empty() {
            BTreeMap::new()
        } else {
            Self::decode_snapshot(&data)?
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Records the filer position of a relative offset.
    ///
    /// Slots are dense: the next expected offset is exactly the current
    /// entry count.
    ///
    /// # Errors
    ///
    /// - [`LogError::EndOfStream`] if `offset` is beyond the next slot
    /// - [`LogError::DuplicateOffset`] if `offset` is already recorded
    pub fn write(&self, offset: u32, position: u64) -> LogResult<()> {
        let mut entries = self.entries.lock();

        if u64::from(offset) > entries.len() as u64 {
            return Err(LogError::EndOfStream);
        }
        if entries.contains_key(&offset) {
            return Err(LogError::DuplicateOffset { offset });
        }
        entries.insert(offset, position);
        Ok(())
    }

    /// Resolves a relative offset to `(offset, position)`.
    ///
    /// `None` means "latest entry". An empty index fails with
    /// [`LogError::EndOfStream`], which the segment consumes as "fresh
    /// index, start at the base offset".
    ///
    /// # Errors
    ///
    /// - [`LogError::EndOfStream`] if the index is empty or the offset is
    ///   past the last entry
    /// - [`LogError::RecordPosition`] if the slot has no mapping
    pub fn read(&self, offset: Option<u32>) -> LogResult<(u32, u64)> {
        let entries = self.entries.lock();

        if entries.is_empty() {
            return Err(LogError::EndOfStream);
        }

        let target = match offset {
            Some(offset) => offset,
            None => (entries.len() - 1) as u32,
        };
        if u64::from(target) >= entries.len() as u64 {
            return Err(LogError::EndOfStream);
        }

        match entries.get(&target) {
            Some(&position) => Ok((target, position)),
            None => Err(LogError::RecordPosition { offset: target }),
        }
    }

    /// Persists the snapshot and releases the index.
    ///
    /// The snapshot replaces the backing file atomically: write to a temp
    /// file, fsync, rename over the target, fsync the directory. Safe to
    /// call repeatedly.
    ///
    /// # Errors
    ///
    /// Returns an error if any step of the atomic replace fails.
    pub fn close(&self) -> LogResult<()> {
        let entries = self.entries.lock();
        let data = Self::encode_snapshot(&entries);

        let temp_path = self.path.with_extension("index.tmp");
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        file.write_all(&data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &self.path)?;
        if let Some(parent) = self.path.parent() {
            dir::sync_directory(parent)?;
        }
        Ok(())
    }

    /// Returns the number of recorded entries.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.entries.lock().len() as u64
    }

    /// Returns the path to the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn encode_snapshot(entries: &BTreeMap<u32, u64>) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_SIZE + entries.len() * ENTRY_SIZE);

        buf.extend_from_slice(&INDEX_MAGIC);
        buf.extend_from_slice(&INDEX_VERSION.to_le_bytes());
        buf.extend_from_slice(&(entries.len() as u32).to_le_bytes());

        for (&offset, &position) in entries {
            buf.extend_from_slice(&offset.to_le_bytes());
            buf.extend_from_slice(&position.to_le_bytes());
        }
        buf
    }

    fn decode_snapshot(data: &[u8]) -> LogResult<BTreeMap<u32, u64>> {
        if data.len() < HEADER_SIZE {
            return Err(LogError::snapshot_corrupted("snapshot too short"));
        }
        if data[0..4] != INDEX_MAGIC {
            return Err(LogError::snapshot_corrupted("invalid snapshot magic"));
        }

        let version = u16::from_le_bytes([data[4], data[5]]);
        if version > INDEX_VERSION {
            return Err(LogError::snapshot_corrupted(format!(
                "unsupported snapshot version: {version}"
            )));
        }

        let count = u32::from_le_bytes([data[6], data[7], data[8], data[9]]) as usize;
        if data.len() != HEADER_SIZE + count * ENTRY_SIZE {
            return Err(LogError::snapshot_corrupted(format!(
                "expected {count} entries, snapshot holds {} bytes",
                data.len()
            )));
        }

        let mut entries = BTreeMap::new();
        let mut cursor = HEADER_SIZE;
        for _ in 0..count {
            let offset = u32::from_le_bytes([
                data[cursor],
                data[cursor + 1],
                data[cursor + 2],
                data[cursor + 3],
            ]);
            cursor += 4;

            let position = u64::from_le_bytes([
                data[cursor],
                data[cursor + 1],
                data[cursor + 2],
                data[cursor + 3],
                data[cursor + 4],
                data[cursor + 5],
                data[cursor + 6],
                data[cursor + 7],
            ]);
            cursor += 8;

            entries.insert(offset, position);
        }

        Ok(entries)
    }
}
