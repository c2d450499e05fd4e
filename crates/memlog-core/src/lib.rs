//! MemLog Core Types
//!
//! Shared value types and conventions for the MemLog write-ahead log:
//!
//! - [`FrameMeta`]: the NDJSON index record describing one frame (one
//!   standalone gzip member in a segment file).
//! - [`layout`]: file naming and directory layout shared by the writer,
//!   the reader, and the tailing agent.
//!
//! ## What is a Frame?
//!
//! A frame is one payload as stored: exactly one standalone gzip member
//! appended to a segment file, plus its matching index record. Concatenation
//! of standalone gzip members is itself a valid gzip stream, so a whole
//! segment can be decompressed in one pass — or any single frame can be
//! decompressed independently using the byte range from its index record.
//!
//! ## On-Disk Layout
//!
//! ```text
//! <root>/data/log.wal/
//!   node-<nodeID>/
//!     <yyyy-mm-dd>/
//!       <prefix>-<ts>-<nnn>.wal.gz    # segment: concatenated gzip members
//!       <prefix>-<ts>-<nnn>.wal.idx   # index: one JSON record per line
//! ```
//!
//! Segment and index base names are identical up to the suffix, and
//! lexicographic order of base names within a day equals chronological order.

pub mod frame;
pub mod layout;

pub use frame::{gzip_member_crc32, FrameMeta};
