//! Storage Error Types
//!
//! All writer and reader operations return `Result<T>`, aliased to
//! `Result<T, Error>`, so failures propagate cleanly with `?`.
//!
//! Policy summary:
//! - Configuration problems fail fast in `WalWriter::new`.
//! - Filesystem errors surface to the caller; the writer never retries
//!   internally, and a frame whose append failed is not indexed.
//! - Malformed index lines are *not* errors: the reader skips them.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid writer config: {0}")]
    Config(String),

    #[error("gzip compression failed: {0}")]
    Compression(std::io::Error),

    #[error("index record encode failed: {0}")]
    IndexEncode(#[from] serde_json::Error),

    #[error("not an index file name: {0}")]
    NotAnIndex(String),

    #[error("already closed")]
    Closed,
}
