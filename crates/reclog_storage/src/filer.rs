//! Filer trait definition.

use crate::error::StorageResult;

/// Width of the frame length header in bytes.
pub const FRAME_HEADER_SIZE: u64 = 8;

/// An append-only store of length-prefixed frames.
///
/// Filers are **opaque payload stores**. Each appended payload is framed
/// with an 8-byte big-endian length header; the payload bytes themselves
/// are never interpreted.
///
/// # Invariants
///
/// - `append` returns the byte position of the frame's length header, which
///   equals the filer size before the append
/// - a positional read observes every prior append (implementations flush
///   their write buffer on each read path)
/// - the filer size equals the sum over frames of `8 + payload length`
/// - filers must be `Send + Sync`; operations serialize on an internal lock
///
/// # Implementors
///
/// - [`super::FileFiler`] - for persistent storage
/// - [`super::InMemoryFiler`] - for testing
pub trait Filer: Send + Sync {
    /// Appends a payload as a new frame.
    ///
    /// Returns `(bytes_written, position)` where `bytes_written` is
    /// `8 + payload.len()` and `position` is the filer size before the
    /// append.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn append(&self, payload: &[u8]) -> StorageResult<(u64, u64)>;

    /// Reads the frame whose length header starts at `position`.
    ///
    /// Returns the payload bytes, without the header.
    ///
    /// # Errors
    ///
    /// Returns an error if the header or payload extends beyond the filer
    /// size, or if an I/O error occurs.
    fn read(&self, position: u64) -> StorageResult<Vec<u8>>;

    /// Reads raw bytes at `position` into `buf`.
    ///
    /// Returns the number of bytes read, which is 0 at end of filer. The
    /// caller parses its own frames; this is the entry point for streaming
    /// consumers.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn read_at(&self, buf: &mut [u8], position: u64) -> StorageResult<usize>;

    /// Flushes buffered appends to the underlying store.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    fn flush(&self) -> StorageResult<()>;

    /// Flushes and syncs all data to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    fn sync(&self) -> StorageResult<()>;

    /// Flushes, syncs and releases the underlying store.
    ///
    /// A closed filer may still be read; implementations reacquire their
    /// resources lazily.
    ///
    /// # Errors
    ///
    /// Returns an error if the final flush or sync fails.
    fn close(&self) -> StorageResult<()>;

    /// Returns the current filer size in bytes, including buffered appends.
    fn size(&self) -> u64;
}
