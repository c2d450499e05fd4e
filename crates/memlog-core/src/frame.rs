//! Frame Metadata - The Index Record
//!
//! Every frame appended to a segment gets exactly one [`FrameMeta`] record in
//! the sidecar index file, serialized as one JSON object per line (NDJSON).
//!
//! ## Invariants
//!
//! For the n-th record of a segment:
//! - `frame == n` (1-based) and `off == sum of len of frames 1..n-1`
//! - `[off, off + len)` lies within the segment named by `file` and
//!   decompresses as exactly one gzip member
//! - the record exists on disk only after the referenced member has been
//!   fully written to the segment (index is the source of truth for
//!   "committed")
//!
//! `recs`, `first_ts`, `last_ts`, and `crc32` are producer-supplied hints;
//! zero means unknown and disables the corresponding verification.

use serde::{Deserialize, Serialize};

/// Index record for one frame of a segment.
///
/// Field names are the on-disk JSON keys; they are part of the WAL contract
/// and must not change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameMeta {
    /// File name of the segment containing the frame (no directory).
    pub file: String,

    /// 1-based sequence number within the segment.
    pub frame: u64,

    /// Byte offset of the compressed member in `file`.
    pub off: u64,

    /// Length in bytes of the compressed member.
    pub len: u64,

    /// Number of records in the uncompressed payload (0 = unknown).
    pub recs: u32,

    /// Unix-nanos timestamp of the first record (0 = unknown).
    pub first_ts: i64,

    /// Unix-nanos timestamp of the last record (0 = unknown).
    pub last_ts: i64,

    /// CRC-32/IEEE of the uncompressed payload (0 = unknown).
    pub crc32: u32,
}

impl FrameMeta {
    /// Serialize to one newline-terminated NDJSON line.
    pub fn to_line(&self) -> serde_json::Result<Vec<u8>> {
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        Ok(line)
    }

    /// Parse one index line (without requiring the trailing newline).
    pub fn from_line(line: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(line)
    }
}

/// Extract the CRC-32 of the uncompressed payload from the trailer of a
/// standalone gzip member.
///
/// The gzip trailer is CRC32 (4 bytes LE) followed by ISIZE (4 bytes LE).
/// Returns `None` if the member is too short to carry a trailer.
pub fn gzip_member_crc32(member: &[u8]) -> Option<u32> {
    if member.len() < 8 {
        return None;
    }
    let tail = &member[member.len() - 8..member.len() - 4];
    Some(u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]))
}
