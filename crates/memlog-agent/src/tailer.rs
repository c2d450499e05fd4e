//! The Tailer - Follow the Newest Index and Ship Frames Downstream
//!
//! Resolution works outside-in: pick the lexicographically greatest
//! `yyyy-mm-dd` child of `node-<id>/` (day names sort chronologically by
//! construction), then the lexicographically greatest `.wal.idx` inside it.
//! The tailer drives an [`IndexReader`] over that index; on end-of-input it
//! re-resolves and either switches to a newer index (segment rotation or day
//! rollover) or sleeps for the poll interval.
//!
//! Frames are gzip-decompressed in 64 KiB chunks straight into the sink.
//! With verification enabled the tailer accumulates CRC-32/IEEE and counts
//! newlines on the decompressed stream; a CRC mismatch is a per-frame error,
//! a record-count mismatch only a warning. Note that by the time a mismatch
//! is known the bytes have already been emitted — streaming decompression
//! cannot be un-emitted.

use flate2::read::GzDecoder;
use memlog_core::{layout, FrameMeta};
use memlog_storage::{FrameSlice, IndexReader};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::error::{Error, Result};

/// Streaming chunk size for decompression.
const STREAM_CHUNK: usize = 64 * 1024;

/// Tailer configuration; mirrors the `memagent` flag surface.
#[derive(Debug, Clone)]
pub struct TailerConfig {
    /// Application root; the WAL lives under `<root>/data/log.wal/`.
    pub root: PathBuf,

    /// Producer identity; selects `node-<nodeID>/`.
    pub node_id: String,

    /// Process currently-available frames and return instead of tailing.
    pub once: bool,

    /// Verify CRC-32 and record counts of decompressed frames.
    pub verify: bool,

    /// Emit a per-frame metadata line on the side channel before the bytes.
    pub emit_meta: bool,

    /// Idle polling interval once the tail is caught up.
    pub poll: Duration,
}

impl Default for TailerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            node_id: String::new(),
            once: false,
            verify: false,
            emit_meta: false,
            poll: Duration::from_millis(500),
        }
    }
}

/// Follows the newest index for one node and relays decompressed frame
/// bytes to a sink.
pub struct Tailer {
    config: TailerConfig,
    frame_errors: u64,
}

impl Tailer {
    pub fn new(config: TailerConfig) -> Self {
        Self {
            config,
            frame_errors: 0,
        }
    }

    /// Frames that failed integrity checks or could not be shipped. Drives
    /// the binary's exit code in `--once` mode.
    pub fn frame_errors(&self) -> u64 {
        self.frame_errors
    }

    /// Run the tail loop, writing decompressed payload bytes to `sink`.
    ///
    /// Returns after draining the current tail when `once` is set; otherwise
    /// runs until cancelled. Only startup resolution failures are fatal —
    /// everything mid-stream is logged and retried after the poll interval.
    pub async fn run<W: AsyncWrite + Unpin>(&mut self, sink: &mut W) -> Result<()> {
        let node_dir = layout::node_dir(&self.config.root, &self.config.node_id);

        let (mut day, mut index_file) = latest_index(&node_dir).await?;
        let mut reader = IndexReader::open_index(node_dir.join(&day), &index_file).await?;
        info!(day = %day, index = %index_file, "tailing");

        loop {
            match reader.next_frame().await {
                Ok(Some((meta, slice))) => {
                    self.ship_frame(&meta, slice, sink).await;
                }
                Ok(None) => {
                    if self.config.once {
                        break;
                    }
                    match latest_index(&node_dir).await {
                        Ok((d, f)) if d != day || f != index_file => {
                            match IndexReader::open_index(node_dir.join(&d), &f).await {
                                Ok(next) => {
                                    reader.close();
                                    reader = next;
                                    day = d;
                                    index_file = f;
                                    info!(day = %day, index = %index_file, "switched to newer index");
                                }
                                Err(error) => {
                                    error!(%error, day = %d, index = %f, "failed to open newer index");
                                    sleep(self.config.poll).await;
                                }
                            }
                        }
                        Ok(_) => sleep(self.config.poll).await,
                        Err(error) => {
                            error!(%error, "failed to resolve latest index");
                            sleep(self.config.poll).await;
                        }
                    }
                }
                Err(error) => {
                    error!(%error, "index read failed");
                    sleep(self.config.poll).await;
                }
            }
        }

        sink.flush().await?;
        Ok(())
    }

    /// Decompress one frame into the sink, verifying if configured. Never
    /// fails the tail loop; errors are logged and counted.
    async fn ship_frame<W: AsyncWrite + Unpin>(
        &mut self,
        meta: &FrameMeta,
        slice: FrameSlice<'_>,
        sink: &mut W,
    ) {
        if self.config.emit_meta {
            info!(
                file = %meta.file,
                frame = meta.frame,
                off = meta.off,
                len = meta.len,
                recs = meta.recs,
                "frame"
            );
        }

        let compressed = match slice.read_to_end().await {
            Ok(bytes) => bytes,
            Err(error) => {
                error!(%error, file = %meta.file, frame = meta.frame, "failed to read frame bytes");
                self.frame_errors += 1;
                return;
            }
        };

        let mut decoder = GzDecoder::new(&compressed[..]);
        let mut crc = crc32fast::Hasher::new();
        let mut newlines: u64 = 0;
        let mut chunk = vec![0u8; STREAM_CHUNK];

        loop {
            let n = match decoder.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(error) => {
                    error!(%error, file = %meta.file, frame = meta.frame, "frame decompression failed");
                    self.frame_errors += 1;
                    return;
                }
            };
            if self.config.verify {
                crc.update(&chunk[..n]);
                newlines += chunk[..n].iter().filter(|&&b| b == b'\n').count() as u64;
            }
            if let Err(error) = sink.write_all(&chunk[..n]).await {
                error!(%error, file = %meta.file, frame = meta.frame, "downstream write failed");
                self.frame_errors += 1;
                return;
            }
        }

        // Per-frame flush so payloads without a trailing newline reach a
        // block-buffered downstream promptly during live tailing.
        if let Err(error) = sink.flush().await {
            error!(%error, file = %meta.file, frame = meta.frame, "downstream flush failed");
            self.frame_errors += 1;
            return;
        }

        if self.config.verify {
            let actual = crc.finalize();
            if meta.crc32 != 0 && actual != meta.crc32 {
                error!(
                    file = %meta.file,
                    frame = meta.frame,
                    expected = meta.crc32,
                    actual,
                    "crc mismatch"
                );
                self.frame_errors += 1;
            }
            if meta.recs != 0 && newlines != meta.recs as u64 {
                warn!(
                    file = %meta.file,
                    frame = meta.frame,
                    expected = meta.recs,
                    actual = newlines,
                    "record count mismatch"
                );
            }
        }
    }
}

/// Resolve the newest `(day, index file)` under a node directory.
///
/// Day children must have exactly the `yyyy-mm-dd` shape; anything else is
/// ignored. Both lookups take the lexicographic maximum.
async fn latest_index(node_dir: &Path) -> Result<(String, String)> {
    let mut latest_day: Option<String> = None;
    let mut entries = tokio::fs::read_dir(node_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if layout::is_day_dir(&name) && latest_day.as_deref() < Some(name.as_str()) {
            latest_day = Some(name);
        }
    }
    let day = latest_day.ok_or_else(|| Error::NoDayDir(node_dir.to_path_buf()))?;

    let day_path = node_dir.join(&day);
    let mut latest_idx: Option<String> = None;
    let mut entries = tokio::fs::read_dir(&day_path).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if layout::is_index_file(&name) && latest_idx.as_deref() < Some(name.as_str()) {
            latest_idx = Some(name);
        }
    }
    let index_file = latest_idx.ok_or(Error::NoIndex(day_path))?;

    Ok((day, index_file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn latest_index_picks_max_day_and_max_index() {
        let dir = TempDir::new().unwrap();
        let node = dir.path().join("node-x");
        for day in ["2024-01-01", "2024-01-02", "not-a-day", "2024-1-3"] {
            std::fs::create_dir_all(node.join(day)).unwrap();
        }
        std::fs::write(node.join("2024-01-01/wal-a.wal.idx"), b"").unwrap();
        std::fs::write(node.join("2024-01-02/wal-a.wal.idx"), b"").unwrap();
        std::fs::write(node.join("2024-01-02/wal-b.wal.idx"), b"").unwrap();
        std::fs::write(node.join("2024-01-02/wal-b.wal.gz"), b"").unwrap();
        std::fs::write(node.join("2024-01-02/junk.txt"), b"").unwrap();

        let (day, idx) = latest_index(&node).await.unwrap();
        assert_eq!(day, "2024-01-02");
        assert_eq!(idx, "wal-b.wal.idx");
    }

    #[tokio::test]
    async fn latest_index_requires_day_and_index() {
        let dir = TempDir::new().unwrap();
        let node = dir.path().join("node-x");
        std::fs::create_dir_all(&node).unwrap();
        assert!(matches!(
            latest_index(&node).await,
            Err(Error::NoDayDir(_))
        ));

        std::fs::create_dir_all(node.join("2024-01-01")).unwrap();
        assert!(matches!(
            latest_index(&node).await,
            Err(Error::NoIndex(_))
        ));
    }

    #[tokio::test]
    async fn missing_node_dir_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            latest_index(&dir.path().join("node-missing")).await,
            Err(Error::Io(_))
        ));
    }
}
