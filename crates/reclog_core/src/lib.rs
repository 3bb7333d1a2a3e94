//! # reclog Core
//!
//! Segmented append-only record log engine.
//!
//! A log is an ordered sequence of opaque records indexed by a
//! monotonically increasing u64 offset. Records live in *segments*, each
//! pairing a framed data file (the filer) with an offset-to-position index
//! (the indexer):
//!
//! ```text
//! <dir>/
//! ├─ LOCK                 # advisory lock, one log instance per directory
//! ├─ {base_offset}.filer  # 8-byte big-endian length-prefixed frames
//! └─ {base_offset}.index  # index snapshot, rewritten on close
//! ```
//!
//! This crate provides:
//! - Record envelope encoding ([`Record`])
//! - The per-segment indexer with durable snapshots
//! - Segment lifecycle: append, read, capacity, close, remove
//! - The log manager: routing, rollover, recovery, truncation and the
//!   streaming byte reader
//!
//! ## Example
//!
//! ```no_run
//! use reclog_core::{Log, LogConfig};
//!
//! let config = LogConfig::new().max_index_size(1024);
//! let log = Log::open("orders-log", config).unwrap();
//!
//! let offset = log.append(b"hello world").unwrap();
//! let record = log.read(offset).unwrap();
//! assert_eq!(record.value, b"hello world");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
mod dir;
pub mod error;
pub mod indexer;
pub mod log;
pub mod record;
pub mod segment;

pub use config::LogConfig;
pub use error::{LogError, LogResult};
pub use log::{Log, LogReader};
pub use record::Record;
