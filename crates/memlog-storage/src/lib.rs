//! MemLog Storage Layer
//!
//! This crate implements the on-disk side of the MemLog WAL pipeline:
//!
//! 1. **WalWriter**: takes opaque payloads (NDJSON log chunks), compresses
//!    each as a standalone gzip member, appends it to the current segment
//!    file, and records the exact byte range in a sidecar NDJSON index.
//! 2. **IndexReader**: tails an index file one complete line at a time and
//!    hands out bounded readers over the compressed byte ranges it names.
//!
//! ## Durability Ordering
//!
//! The writer appends segment bytes *before* it flushes the matching index
//! line. An index record on disk therefore always points at fully written
//! segment bytes; segment bytes without an index line are treated as absent.
//! The writer does not fsync per frame (a throughput choice) but does sync
//! both files at rotation boundaries and on explicit `sync()`.
//!
//! ## Crash Tolerance on the Read Side
//!
//! The reader consumes only complete newline-terminated index lines and
//! silently skips lines that fail to parse, so the narrow window in which a
//! writer crash leaves a torn trailing line never becomes a hard error.
//!
//! ## Usage
//!
//! ```ignore
//! use memlog_storage::{WalWriter, WriterConfig, IndexReader};
//!
//! let writer = WalWriter::new(WriterConfig {
//!     directory: day_dir.clone(),
//!     max_bytes: 64 * 1024 * 1024,
//!     ..Default::default()
//! })?;
//!
//! let meta = writer.write_frame(b"{\"msg\":\"hi\"}\n", 1, ts, ts).await?;
//! writer.close().await?;
//!
//! let mut reader = IndexReader::open_index(&day_dir, &index_name).await?;
//! while let Some((meta, slice)) = reader.next_frame().await? {
//!     let compressed = slice.read_to_end().await?;
//!     // gzip-decompress `compressed` to recover the payload
//! }
//! ```

pub mod config;
pub mod error;
pub mod reader;
pub mod writer;

pub use config::WriterConfig;
pub use error::{Error, Result};
pub use reader::{FrameSlice, IndexReader};
pub use writer::WalWriter;
