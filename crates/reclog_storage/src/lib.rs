//! # reclog Storage
//!
//! Framed byte store for the reclog segmented record log.
//!
//! This crate provides the lowest-level storage abstraction: a **filer**, an
//! append-only file of length-prefixed frames. Filers do not interpret the
//! payloads they store; the log engine owns all record semantics.
//!
//! ## Frame Format
//!
//! ```text
//! | length u64 BE (8) | payload (length bytes) |
//! ```
//!
//! Frames are written contiguously with no padding. The position of a frame
//! is the position of its length header.
//!
//! ## Design Principles
//!
//! - Appends go through a write buffer; every read path flushes the buffer
//!   first so positional reads always observe prior appends
//! - Filers must be `Send + Sync`; all operations serialize on an internal
//!   mutex so a streaming consumer can read while a writer holds them
//! - Closing a filer drops its file handle; a later read reopens it lazily
//!
//! ## Available Filers
//!
//! - [`FileFiler`] - persistent storage using OS file APIs
//! - [`InMemoryFiler`] - for testing and ephemeral storage
//!
//! ## Example
//!
//! ```rust
//! use reclog_storage::{Filer, InMemoryFiler};
//!
//! let filer = InMemoryFiler::new();
//! let (written, position) = filer.append(b"hello world").unwrap();
//! assert_eq!(written, 8 + 11);
//! assert_eq!(position, 0);
//! assert_eq!(filer.read(position).unwrap(), b"hello world");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod filer;
mod memory;

pub use error::{StorageError, StorageResult};
pub use file::FileFiler;
pub use filer::{Filer, FRAME_HEADER_SIZE};
pub use memory::InMemoryFiler;
