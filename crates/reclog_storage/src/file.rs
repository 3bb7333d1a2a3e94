//! File-backed filer for persistent storage.

use crate::error::{StorageError, StorageResult};
use crate::filer::{Filer, FRAME_HEADER_SIZE};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Buffered appends spill to the file once they exceed this many bytes.
const WRITE_BUFFER_CAPACITY: usize = 4096;

/// A file-backed filer.
///
/// Appends are staged in a write buffer and spilled to the file when the
/// buffer fills, on any read, or on flush/sync/close. Writes always seek to
/// the end of the file first, so interleaved positional reads cannot
/// misplace a frame.
///
/// # Lifecycle
///
/// `close` flushes, syncs and drops the file handle. The filer stays
/// usable: the next operation that needs the handle reopens it from the
/// stored path. This is how a closed segment still serves reads.
///
/// # Example
///
/// ```no_run
/// use reclog_storage::{Filer, FileFiler};
/// use std::path::Path;
///
/// let filer = FileFiler::open(Path::new("0.filer")).unwrap();
/// let (_, position) = filer.append(b"payload").unwrap();
/// assert_eq!(filer.read(position).unwrap(), b"payload");
/// ```
#[derive(Debug)]
pub struct FileFiler {
    path: PathBuf,
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    /// `None` after `close`; reopened lazily.
    file: Option<File>,
    /// Staged appends not yet written to the file.
    buf: Vec<u8>,
    /// Cached filer size, including staged appends.
    size: u64,
}

impl FileFiler {
    /// Opens or creates a filer file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created, or its
    /// size cannot be read.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = Self::open_file(path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(Inner {
                file: Some(file),
                buf: Vec::new(),
                size,
            }),
        })
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_file(path: &Path) -> StorageResult<File> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        Ok(file)
    }

    fn handle<'a>(path: &Path, inner: &'a mut Inner) -> StorageResult<&'a mut File> {
        if inner.file.is_none() {
            inner.file = Some(Self::open_file(path)?);
        }
        Ok(inner.file.as_mut().expect("handle initialized above"))
    }

    /// Writes staged appends to the end of the file.
    fn spill(path: &Path, inner: &mut Inner) -> StorageResult<()> {
        if inner.buf.is_empty() {
            return Ok(());
        }
        let buf = std::mem::take(&mut inner.buf);
        let file = Self::handle(path, inner)?;
        file.seek(SeekFrom::End(0))?;
        file.write_all(&buf)?;
        Ok(())
    }
}

impl Filer for FileFiler {
    fn append(&self, payload: &[u8]) -> StorageResult<(u64, u64)> {
        let mut inner = self.inner.lock();

        let position = inner.size;
        inner
            .buf
            .extend_from_slice(&(payload.len() as u64).to_be_bytes());
        inner.buf.extend_from_slice(payload);

        let written = FRAME_HEADER_SIZE + payload.len() as u64;
        inner.size += written;

        if inner.buf.len() >= WRITE_BUFFER_CAPACITY {
            Self::spill(&self.path, &mut inner)?;
        }
        Ok((written, position))
    }

    fn read(&self, position: u64) -> StorageResult<Vec<u8>> {
        let mut inner = self.inner.lock();
        Self::spill(&self.path, &mut inner)?;

        let size = inner.size;
        if position + FRAME_HEADER_SIZE > size {
            return Err(StorageError::ReadPastEnd {
                offset: position,
                len: FRAME_HEADER_SIZE as usize,
                size,
            });
        }

        let file = Self::handle(&self.path, &mut inner)?;
        file.seek(SeekFrom::Start(position))?;
        let mut header = [0u8; FRAME_HEADER_SIZE as usize];
        file.read_exact(&mut header)?;

        let len = u64::from_be_bytes(header);
        if position + FRAME_HEADER_SIZE + len > size {
            return Err(StorageError::ReadPastEnd {
                offset: position + FRAME_HEADER_SIZE,
                len: len as usize,
                size,
            });
        }

        let mut payload = vec![0u8; len as usize];
        file.read_exact(&mut payload)?;
        Ok(payload)
    }

    fn read_at(&self, buf: &mut [u8], position: u64) -> StorageResult<usize> {
        let mut inner = self.inner.lock();
        Self::spill(&self.path, &mut inner)?;

        let size = inner.size;
        if position >= size {
            return Ok(0);
        }
        let n = (size - position).min(buf.len() as u64) as usize;

        let file = Self::handle(&self.path, &mut inner)?;
        file.seek(SeekFrom::Start(position))?;
        file.read_exact(&mut buf[..n])?;
        Ok(n)
    }

    fn flush(&self) -> StorageResult<()> {
        let mut inner = self.inner.lock();
        Self::spill(&self.path, &mut inner)?;
        if let Some(file) = inner.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }

    fn sync(&self) -> StorageResult<()> {
        let mut inner = self.inner.lock();
        Self::spill(&self.path, &mut inner)?;
        if let Some(file) = inner.file.as_ref() {
            file.sync_all()?;
        }
        Ok(())
    }

    fn close(&self) -> StorageResult<()> {
        let mut inner = self.inner.lock();
        Self::spill(&self.path, &mut inner)?;
        if let Some(file) = inner.file.take() {
            file.sync_all()?;
        }
        Ok(())
    }

    fn size(&self) -> u64 {
        self.inner.lock().size
    }
}
