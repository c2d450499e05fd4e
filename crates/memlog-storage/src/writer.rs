//! WAL Segment Writer
//!
//! [`WalWriter`] turns each payload into one frame: a standalone gzip member
//! appended to the current segment file plus one NDJSON record appended to
//! the sidecar index. Segment/index pairs are created lazily on the first
//! write and sealed by rotation or `close()`.
//!
//! ## WriteFrame Path
//!
//! 1. Rotate if the size or interval threshold says so (checked before the
//!    payload is compressed, using the payload size as the predictor).
//! 2. Open a fresh pair if none is open.
//! 3. Gzip the payload into memory as exactly one member.
//! 4. Append the member to the segment, *then* flush the index line.
//!
//! Step 4's ordering is the durability contract: a reader that sees an index
//! line can trust the referenced segment range exists.
//!
//! ## Concurrency
//!
//! `write_frame`, `sync`, and `close` serialize on one internal mutex.
//! External call ordering across tasks is the caller's responsibility.

use chrono::Utc;
use flate2::GzBuilder;
use memlog_core::{gzip_member_crc32, layout, FrameMeta};
use std::io::Write as _;
use std::time::Instant;
use tokio::fs::{DirBuilder, File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::config::WriterConfig;
use crate::error::{Error, Result};

/// Append-only writer for one directory of segment/index pairs.
pub struct WalWriter {
    inner: Mutex<Inner>,
}

struct Inner {
    config: WriterConfig,
    /// Roll counter feeding the `-nnn` component of segment base names.
    roll: u32,
    closed: bool,
    current: Option<OpenPair>,
}

/// An open segment file plus its sidecar index.
struct OpenPair {
    /// Segment file name (base + `.wal.gz`), as recorded in index lines.
    segment_file: String,
    segment: File,
    index: BufWriter<File>,
    /// Compressed bytes appended to the segment so far.
    cur_size: u64,
    /// 1-based frame counter; the next frame gets `frame_seq + 1`.
    frame_seq: u64,
    opened_at: Instant,
}

impl WalWriter {
    /// Validate the config and capture it. Touches no files; the first
    /// segment/index pair is created on the first `write_frame`.
    pub fn new(config: WriterConfig) -> Result<Self> {
        if config.directory.as_os_str().is_empty() {
            return Err(Error::Config("directory is required".to_string()));
        }
        Ok(Self {
            inner: Mutex::new(Inner {
                config,
                roll: 0,
                closed: false,
                current: None,
            }),
        })
    }

    /// Append one frame and its index record.
    ///
    /// `recs`, `first_ts`, and `last_ts` are producer-supplied payload stats
    /// recorded verbatim in the index (zero = unknown). Returns the index
    /// record that was written.
    ///
    /// On error the frame is not indexed and the writer stays usable; the
    /// caller may retry.
    pub async fn write_frame(
        &self,
        payload: &[u8],
        recs: u32,
        first_ts: i64,
        last_ts: i64,
    ) -> Result<FrameMeta> {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return Err(Error::Closed);
        }

        if inner.should_rotate(payload.len() as u64) {
            inner.rotate().await?;
        }
        if inner.current.is_none() {
            inner.open_pair().await?;
        }

        let compression = inner.config.compression();
        let pair = match inner.current.as_mut() {
            Some(pair) => pair,
            None => return Err(Error::Closed), // unreachable: open_pair just ran
        };

        // One standalone gzip member per payload, FNAME carrying a debug
        // label for the frame it will become.
        let label = format!("frame-{}", pair.frame_seq + 1);
        let mut encoder = GzBuilder::new().filename(label).write(
            Vec::with_capacity(payload.len() / 2 + 64),
            compression,
        );
        encoder.write_all(payload).map_err(Error::Compression)?;
        let member = encoder.finish().map_err(Error::Compression)?;

        let crc = crc32fast::hash(payload);
        debug_assert_eq!(gzip_member_crc32(&member), Some(crc));

        // Segment bytes first. A failed append leaves the frame unindexed.
        let off = pair.cur_size;
        pair.segment.write_all(&member).await?;
        pair.cur_size += member.len() as u64;
        pair.frame_seq += 1;

        let meta = FrameMeta {
            file: pair.segment_file.clone(),
            frame: pair.frame_seq,
            off,
            len: member.len() as u64,
            recs,
            first_ts,
            last_ts,
            crc32: crc,
        };

        let line = meta.to_line()?;
        pair.index.write_all(&line).await?;
        pair.index.flush().await?;

        trace!(
            segment = %meta.file,
            frame = meta.frame,
            off = meta.off,
            len = meta.len,
            recs = meta.recs,
            "frame appended"
        );

        Ok(meta)
    }

    /// Flush the index buffer and `sync_data` both files of the current
    /// pair. No-op when no segment is open.
    pub async fn sync(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if let Some(pair) = inner.current.as_mut() {
            pair.index.flush().await?;
            pair.index.get_ref().sync_data().await?;
            pair.segment.sync_data().await?;
        }
        Ok(())
    }

    /// Current segment file name and bytes appended so far. Diagnostic only;
    /// `None` before the first write and after rotation until the next one.
    pub async fn current_file(&self) -> Option<(String, u64)> {
        let inner = self.inner.lock().await;
        inner
            .current
            .as_ref()
            .map(|pair| (pair.segment_file.clone(), pair.cur_size))
    }

    /// Flush the index buffer, `sync_data` both files, and close them.
    /// Idempotent; a failure here still fences further writes, so flush or
    /// sync errors are surfaced instead of lost on drop.
    pub async fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return Ok(());
        }
        inner.closed = true;
        if let Some(mut pair) = inner.current.take() {
            pair.index.flush().await?;
            pair.index.get_ref().sync_data().await?;
            pair.segment.sync_data().await?;
        }
        Ok(())
    }
}

impl Inner {
    /// Rotation predicate. The incoming payload size over-approximates the
    /// eventual member size so nothing is compressed twice; a fresh segment
    /// accepts a frame of any size.
    fn should_rotate(&self, incoming_len: u64) -> bool {
        let Some(pair) = self.current.as_ref() else {
            return false;
        };
        if self.config.max_bytes > 0 && pair.cur_size + incoming_len > self.config.max_bytes {
            return true;
        }
        !self.config.max_interval.is_zero() && pair.opened_at.elapsed() >= self.config.max_interval
    }

    /// Seal the current pair: flush, sync both files, drop the handles.
    async fn rotate(&mut self) -> Result<()> {
        if let Some(mut pair) = self.current.take() {
            pair.index.flush().await?;
            pair.index.get_ref().sync_data().await?;
            pair.segment.sync_data().await?;
            debug!(
                segment = %pair.segment_file,
                frames = pair.frame_seq,
                bytes = pair.cur_size,
                "segment sealed"
            );
        }
        Ok(())
    }

    /// Create the next segment/index pair in the configured directory.
    async fn open_pair(&mut self) -> Result<()> {
        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o755);
        builder.create(&self.config.directory).await?;

        let base = layout::segment_base(&self.config.prefix, Utc::now(), self.roll);
        self.roll += 1;

        let segment_file = format!("{base}{}", layout::SEGMENT_SUFFIX);
        let index_file = format!("{base}{}", layout::INDEX_SUFFIX);

        let segment = open_append(&self.config.directory.join(&segment_file)).await?;
        let index = open_append(&self.config.directory.join(&index_file)).await?;

        debug!(segment = %segment_file, "segment opened");

        self.current = Some(OpenPair {
            segment_file,
            segment,
            index: BufWriter::new(index),
            cur_size: 0,
            frame_seq: 0,
            opened_at: Instant::now(),
        });
        Ok(())
    }
}

async fn open_append(path: &std::path::Path) -> Result<File> {
    let mut options = OpenOptions::new();
    options.create(true).write(true).append(true);
    #[cfg(unix)]
    options.mode(0o644);
    Ok(options.open(path).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> WriterConfig {
        WriterConfig {
            directory: dir.path().to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn missing_directory_is_rejected() {
        let err = WalWriter::new(WriterConfig::default()).err();
        assert!(matches!(err, Some(Error::Config(_))));
    }

    #[tokio::test]
    async fn files_are_created_lazily() {
        let dir = TempDir::new().unwrap();
        let writer = WalWriter::new(config(&dir)).unwrap();

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert!(writer.current_file().await.is_none());

        writer.write_frame(b"a\n", 1, 1, 1).await.unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);

        let (file, size) = writer.current_file().await.unwrap();
        assert!(file.ends_with(memlog_core::layout::SEGMENT_SUFFIX));
        assert!(size > 0);
        writer.close().await.unwrap();
    }

    #[tokio::test]
    async fn meta_invariants_hold_across_frames() {
        let dir = TempDir::new().unwrap();
        let writer = WalWriter::new(config(&dir)).unwrap();

        let m1 = writer.write_frame(b"a\nb\n", 2, 10, 20).await.unwrap();
        let m2 = writer.write_frame(b"c\n", 1, 30, 30).await.unwrap();
        let m3 = writer.write_frame(b"", 0, 0, 0).await.unwrap();

        assert_eq!((m1.frame, m2.frame, m3.frame), (1, 2, 3));
        assert_eq!(m1.off, 0);
        assert_eq!(m2.off, m1.len);
        assert_eq!(m3.off, m1.len + m2.len);
        assert_eq!(m1.file, m2.file);
        assert_eq!(m2.file, m3.file);

        // Empty payload still produces a non-empty member with a real CRC.
        assert!(m3.len > 0);
        assert_eq!(m3.crc32, crc32fast::hash(b""));

        // The segment is exactly the concatenation of the indexed ranges.
        writer.close().await.unwrap();
        let segment = std::fs::read(dir.path().join(&m1.file)).unwrap();
        assert_eq!(segment.len() as u64, m3.off + m3.len);
    }

    #[tokio::test]
    async fn close_is_idempotent_and_fences_writes() {
        let dir = TempDir::new().unwrap();
        let writer = WalWriter::new(config(&dir)).unwrap();
        writer.write_frame(b"x\n", 1, 1, 1).await.unwrap();

        writer.close().await.unwrap();
        writer.close().await.unwrap();

        let err = writer.write_frame(b"y\n", 1, 2, 2).await.err();
        assert!(matches!(err, Some(Error::Closed)));
    }

    #[tokio::test]
    async fn close_seals_the_open_pair() {
        let dir = TempDir::new().unwrap();
        let writer = WalWriter::new(config(&dir)).unwrap();
        let meta = writer.write_frame(b"a\nb\n", 2, 10, 20).await.unwrap();
        writer.close().await.unwrap();

        // Both files are complete on disk after close: the index holds the
        // full record and the segment holds exactly the indexed range.
        let index_file = meta.file.replace(
            memlog_core::layout::SEGMENT_SUFFIX,
            memlog_core::layout::INDEX_SUFFIX,
        );
        let index = std::fs::read(dir.path().join(&index_file)).unwrap();
        assert_eq!(FrameMeta::from_line(&index).unwrap(), meta);

        let segment = std::fs::read(dir.path().join(&meta.file)).unwrap();
        assert_eq!(segment.len() as u64, meta.off + meta.len);
        assert_eq!(gzip_member_crc32(&segment), Some(meta.crc32));
    }

    #[tokio::test]
    async fn oversized_first_frame_is_accepted() {
        let dir = TempDir::new().unwrap();
        let writer = WalWriter::new(WriterConfig {
            max_bytes: 16,
            ..config(&dir)
        })
        .unwrap();

        // Far larger than max_bytes: lands alone in a fresh segment.
        let big = vec![b'x'; 4096];
        let m1 = writer.write_frame(&big, 0, 0, 0).await.unwrap();
        assert_eq!(m1.frame, 1);

        // The next frame rotates because the first segment is over budget.
        let m2 = writer.write_frame(b"y\n", 1, 1, 1).await.unwrap();
        assert_eq!(m2.frame, 1);
        assert_ne!(m1.file, m2.file);
        writer.close().await.unwrap();
    }

    #[tokio::test]
    async fn interval_rotation_opens_new_pair() {
        let dir = TempDir::new().unwrap();
        let writer = WalWriter::new(WriterConfig {
            max_interval: Duration::from_millis(50),
            ..config(&dir)
        })
        .unwrap();

        let m1 = writer.write_frame(b"one\n", 1, 1, 1).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        let m2 = writer.write_frame(b"two\n", 1, 2, 2).await.unwrap();

        assert_ne!(m1.file, m2.file);
        assert_eq!(m2.frame, 1);
        assert_eq!(m2.off, 0);
        writer.close().await.unwrap();
    }

    #[tokio::test]
    async fn sync_flushes_without_rotating() {
        let dir = TempDir::new().unwrap();
        let writer = WalWriter::new(config(&dir)).unwrap();

        // Sync with nothing open is a no-op.
        writer.sync().await.unwrap();

        let m1 = writer.write_frame(b"a\n", 1, 1, 1).await.unwrap();
        writer.sync().await.unwrap();
        let m2 = writer.write_frame(b"b\n", 1, 2, 2).await.unwrap();
        assert_eq!(m1.file, m2.file);
        writer.close().await.unwrap();
    }
}
