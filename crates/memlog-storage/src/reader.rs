//! Index Reader - Tailing One Index and Its Segment
//!
//! [`IndexReader`] follows a single index file, yielding one
//! `(FrameMeta, FrameSlice)` pair per complete index line. It never
//! repositions backward and never coordinates with the writer; correctness
//! comes from the writer's segment-before-index ordering plus two local
//! rules:
//!
//! - **Complete lines only.** Bytes after the last `\n` stay in a pending
//!   buffer until more bytes arrive, so a torn trailing line reads as "not
//!   yet written" rather than as corruption.
//! - **Skip malformed lines.** A line that fails to parse as a frame record
//!   is dropped and the scan continues. This absorbs the narrow crash window
//!   between a segment append and a full index flush.
//!
//! The [`FrameSlice`] handed to the caller is a bounded cursor over
//! `[off, off + len)` of the open segment file. It borrows the reader's
//! segment handle: dropping it does not close the segment, and the caller
//! must drain it before asking for the next frame.

use bytes::Bytes;
use memlog_core::{layout, FrameMeta};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::debug;

use crate::error::{Error, Result};

/// How much index tail to pull per read when looking for a newline.
const INDEX_READ_CHUNK: usize = 8 * 1024;

/// Stateful tail-follower over one index file and the segment(s) it names.
pub struct IndexReader {
    dir: PathBuf,
    index_file: String,
    index: Option<File>,
    /// Bytes read from the index that do not yet end in a newline.
    pending: Vec<u8>,
    segment: Option<OpenSegment>,
}

struct OpenSegment {
    file: String,
    handle: File,
}

impl IndexReader {
    /// Open an index file and the segment it is paired with.
    ///
    /// The segment name is inferred by suffix replacement
    /// (`.wal.idx` → `.wal.gz`). Fails if either file is absent.
    pub async fn open_index(dir: impl AsRef<Path>, index_file: &str) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let segment_file = layout::segment_file_for_index(index_file)
            .ok_or_else(|| Error::NotAnIndex(index_file.to_string()))?;

        let index = File::open(dir.join(index_file)).await?;
        let handle = File::open(dir.join(&segment_file)).await?;

        Ok(Self {
            dir,
            index_file: index_file.to_string(),
            index: Some(index),
            pending: Vec::new(),
            segment: Some(OpenSegment {
                file: segment_file,
                handle,
            }),
        })
    }

    /// Name of the index file being tailed.
    pub fn index_file(&self) -> &str {
        &self.index_file
    }

    /// Directory holding the index and its segments.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Next complete index record and a bounded reader over its compressed
    /// bytes.
    ///
    /// Returns `Ok(None)` when no complete line is available yet — the
    /// caller owns the polling cadence and may retry after a sleep. The same
    /// reader picks up lines appended after the last call.
    pub async fn next_frame(&mut self) -> Result<Option<(FrameMeta, FrameSlice<'_>)>> {
        loop {
            if let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = self.pending.drain(..=pos).collect();
                let line = &line[..line.len() - 1];

                let meta = match FrameMeta::from_line(line) {
                    Ok(meta) => meta,
                    Err(error) => {
                        debug!(%error, "skipping malformed index line");
                        continue;
                    }
                };

                // Defensive: follow a writer-driven segment switch recorded
                // inside a single index. In the day-directory layout each
                // index names exactly one segment, but the format allows it.
                let switch = match self.segment.as_ref() {
                    Some(seg) => seg.file != meta.file,
                    None => true,
                };
                if switch {
                    self.open_segment_file(&meta.file).await?;
                }

                let seg = self.segment.as_mut().ok_or(Error::Closed)?;
                seg.handle.seek(std::io::SeekFrom::Start(meta.off)).await?;
                let remaining = meta.len;
                return Ok(Some((
                    meta,
                    FrameSlice {
                        file: &mut seg.handle,
                        remaining,
                    },
                )));
            }

            let index = self.index.as_mut().ok_or(Error::Closed)?;
            let mut chunk = [0u8; INDEX_READ_CHUNK];
            let n = index.read(&mut chunk).await?;
            if n == 0 {
                return Ok(None);
            }
            self.pending.extend_from_slice(&chunk[..n]);
        }
    }

    async fn open_segment_file(&mut self, file: &str) -> Result<()> {
        let handle = File::open(self.dir.join(file)).await?;
        self.segment = Some(OpenSegment {
            file: file.to_string(),
            handle,
        });
        Ok(())
    }

    /// Close both files. Idempotent; a closed reader returns `Closed` from
    /// `next_frame`.
    pub fn close(&mut self) {
        self.index = None;
        self.segment = None;
    }
}

/// Bounded cursor over one frame's compressed bytes.
///
/// Borrows the reader's open segment handle: it must be drained (or dropped)
/// before the next `next_frame` call, and dropping it leaves the segment
/// open.
pub struct FrameSlice<'a> {
    file: &'a mut File,
    remaining: u64,
}

impl FrameSlice<'_> {
    /// Compressed bytes left in the window.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Read up to `buf.len()` bytes, never past the window. Returns 0 once
    /// the window is drained; a segment shorter than the window is an error.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let cap = buf.len().min(self.remaining.min(usize::MAX as u64) as usize);
        let n = self.file.read(&mut buf[..cap]).await?;
        if n == 0 {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "segment truncated inside an indexed frame",
            )));
        }
        self.remaining -= n as u64;
        Ok(n)
    }

    /// Drain the whole window into memory.
    pub async fn read_to_end(mut self) -> Result<Bytes> {
        let mut out = vec![0u8; self.remaining.min(usize::MAX as u64) as usize];
        self.file.read_exact(&mut out).await?;
        self.remaining = 0;
        Ok(Bytes::from(out))
    }
}
