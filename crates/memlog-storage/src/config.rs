//! Writer Configuration

use flate2::Compression;
use memlog_core::layout;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for [`crate::WalWriter`].
///
/// `max_bytes` and `max_interval` are independent rotation triggers; zero
/// disables the corresponding trigger. With both disabled the writer keeps
/// appending to a single segment until closed.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Directory that receives segment/index pairs. Required.
    ///
    /// The writer does not advance day directories itself; the producer
    /// hands a fresh writer a new directory when a new UTC day begins.
    pub directory: PathBuf,

    /// Segment base-name prefix (default `"wal"`).
    pub prefix: String,

    /// Rotate once the current segment's compressed size plus the incoming
    /// payload size would exceed this many bytes. Zero disables.
    ///
    /// The incoming *uncompressed* payload size is used as a conservative
    /// predictor so the payload is never compressed twice.
    pub max_bytes: u64,

    /// Rotate once the current segment has been open this long. Zero
    /// disables. Checked synchronously inside `write_frame`; an idle writer
    /// keeps a half-full segment open.
    pub max_interval: Duration,

    /// Gzip compression level (0-9). `None` favors speed.
    pub gzip_level: Option<u32>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::new(),
            prefix: layout::DEFAULT_PREFIX.to_string(),
            max_bytes: 0,
            max_interval: Duration::ZERO,
            gzip_level: None,
        }
    }
}

impl WriterConfig {
    pub(crate) fn compression(&self) -> Compression {
        match self.gzip_level {
            Some(level) => Compression::new(level),
            None => Compression::fast(),
        }
    }
}
