//! Log directory management.
//!
//! File system layout of a log directory:
//!
//! ```text
//! <dir>/
//! ├─ LOCK                 # advisory lock, one log instance per directory
//! ├─ {base_offset}.filer  # framed record bytes of one segment
//! └─ {base_offset}.index  # index snapshot of the same segment
//! ```
//!
//! `base_offset` is the decimal representation of a u64. The two files of a
//! segment share a stem; recovery deduplicates stems to find segments.

use crate::error::{LogError, LogResult};
use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

const LOCK_FILE: &str = "LOCK";
const FILER_EXTENSION: &str = "filer";
const INDEX_EXTENSION: &str = "index";

/// Returns the filer file path for a segment base offset.
pub(crate) fn filer_path(dir: &Path, base_offset: u64) -> PathBuf {
    dir.join(format!("{base_offset}.{FILER_EXTENSION}"))
}

/// Returns the index file path for a segment base offset.
pub(crate) fn index_path(dir: &Path, base_offset: u64) -> PathBuf {
    dir.join(format!("{base_offset}.{INDEX_EXTENSION}"))
}

/// Acquires the directory's advisory lock.
///
/// The returned handle holds the lock for its lifetime. A second holder
/// fails with [`LogError::DirectoryLocked`].
pub(crate) fn lock_directory(dir: &Path) -> LogResult<File> {
    use fs2::FileExt;

    let lock_file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(dir.join(LOCK_FILE))?;

    if lock_file.try_lock_exclusive().is_err() {
        return Err(LogError::DirectoryLocked);
    }
    Ok(lock_file)
}

/// Enumerates the unique segment base offsets in a directory, ascending.
///
/// Files whose stem does not parse as a u64 (including the lock file) are
/// not segment files and are skipped.
pub(crate) fn list_base_offsets(dir: &Path) -> LogResult<Vec<u64>> {
    let mut offsets = BTreeSet::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        match stem.parse::<u64>() {
            Ok(offset) => {
                offsets.insert(offset);
            }
            Err(_) => {
                if stem != LOCK_FILE {
                    debug!(file = %path.display(), "skipping non-segment file");
                }
            }
        }
    }

    Ok(offsets.into_iter().collect())
}

/// Syncs a directory so file creations, renames and deletions are durable.
///
/// Windows NTFS journals metadata, so the explicit fsync is Unix-only.
#[cfg(unix)]
pub(crate) fn sync_directory(dir: &Path) -> LogResult<()> {
    let dir = File::open(dir)?;
    dir.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
pub(crate) fn sync_directory(_dir: &Path) -> LogResult<()> {
    Ok(())
}
