//! Agent Error Types
//!
//! Only startup-time resolution failures are fatal; everything the tailer
//! hits mid-stream is logged and retried after the poll interval.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Storage(#[from] memlog_storage::Error),

    #[error("no day directory under {0}")]
    NoDayDir(PathBuf),

    #[error("no index file under {0}")]
    NoIndex(PathBuf),
}
