//! In-memory filer for testing and ephemeral storage.

use crate::error::{StorageError, StorageResult};
use crate::filer::{Filer, FRAME_HEADER_SIZE};
use parking_lot::Mutex;

/// An in-memory filer.
///
/// Stores frames in a `Vec<u8>` with the same framing and semantics as
/// [`super::FileFiler`]. Nothing survives the process; flush, sync and
/// close are no-ops.
#[derive(Debug, Default)]
pub struct InMemoryFiler {
    data: Mutex<Vec<u8>>,
}

impl InMemoryFiler {
    /// Creates a new empty in-memory filer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Filer for InMemoryFiler {
    fn append(&self, payload: &[u8]) -> StorageResult<(u64, u64)> {
        let mut data = self.data.lock();

        let position = data.len() as u64;
        data.extend_from_slice(&(payload.len() as u64).to_be_bytes());
        data.extend_from_slice(payload);

        Ok((FRAME_HEADER_SIZE + payload.len() as u64, position))
    }

    fn read(&self, position: u64) -> StorageResult<Vec<u8>> {
        let data = self.data.lock();
        let size = data.len() as u64;

        if position + FRAME_HEADER_SIZE > size {
            return Err(StorageError::ReadPastEnd {
                offset: position,
                len: FRAME_HEADER_SIZE as usize,
                size,
            });
        }

        let start = position as usize;
        let mut header = [0u8; FRAME_HEADER_SIZE as usize];
        header.copy_from_slice(&data[start..start + FRAME_HEADER_SIZE as usize]);

        let len = u64::from_be_bytes(header);
        if position + FRAME_HEADER_SIZE + len > size {
            return Err(StorageError::ReadPastEnd {
                offset: position + FRAME_HEADER_SIZE,
                len: len as usize,
                size,
            });
        }

        let payload_start = start + FRAME_HEADER_SIZE as usize;
        Ok(data[payload_start..payload_start + len as usize].to_vec())
    }

    fn read_at(&self, buf: &mut [u8], position: u64) -> StorageResult<usize> {
        let data = self.data.lock();
        let size = data.len() as u64;

        if position >= size {
            return Ok(0);
        }
        let n = (size - position).min(buf.len() as u64) as usize;
        let start = position as usize;
        buf[..n].copy_from_slice(&data[start..start + n]);
        Ok(n)
    }

    fn flush(&self) -> StorageResult<()> {
        Ok(())
    }

    fn sync(&self) -> StorageResult<()> {
        Ok(())
    }

    fn close(&self) -> StorageResult<()> {
        Ok(())
    }

    fn size(&self) -> u64 {
        self.data.lock().len() as u64
    }
}
