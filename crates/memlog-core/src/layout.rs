//! On-Disk Layout Conventions
//!
//! File naming and directory structure shared by the writer, the index
//! reader, and the tailing agent. Everything here is pure string/path
//! manipulation; no filesystem access.
//!
//! Segment and index files come in pairs that share a base name:
//!
//! ```text
//! wal-20240101T120000Z-000.wal.gz     # segment
//! wal-20240101T120000Z-000.wal.idx    # index
//! ```
//!
//! The timestamp component is the UTC open instant and `nnn` is the writer's
//! roll counter, so lexicographic order of base names within a day directory
//! equals chronological order of rotation events.

use chrono::{DateTime, NaiveDate, Utc};
use std::path::{Path, PathBuf};

/// Suffix of segment files (concatenated gzip members).
pub const SEGMENT_SUFFIX: &str = ".wal.gz";

/// Suffix of index files (newline-delimited JSON).
pub const INDEX_SUFFIX: &str = ".wal.idx";

/// Default segment base-name prefix.
pub const DEFAULT_PREFIX: &str = "wal";

/// Build a new segment/index base name from the open instant and roll count:
/// `<prefix>-YYYYMMDDThhmmssZ-<nnn>`.
pub fn segment_base(prefix: &str, opened_at: DateTime<Utc>, roll: u32) -> String {
    format!(
        "{prefix}-{}-{roll:03}",
        opened_at.format("%Y%m%dT%H%M%SZ")
    )
}

/// Derive the segment file name paired with the given index file name.
///
/// Returns `None` if the name does not end in [`INDEX_SUFFIX`].
pub fn segment_file_for_index(index_file: &str) -> Option<String> {
    let base = index_file.strip_suffix(INDEX_SUFFIX)?;
    Some(format!("{base}{SEGMENT_SUFFIX}"))
}

/// Whether a file name is an index file.
pub fn is_index_file(name: &str) -> bool {
    name.ends_with(INDEX_SUFFIX)
}

/// Whether a directory name has exactly the `yyyy-mm-dd` day shape.
///
/// The check is strict: ten characters, hyphens at positions 4 and 7, and a
/// calendar-valid date. Anything else is not a day directory and is ignored
/// by latest-day resolution.
pub fn is_day_dir(name: &str) -> bool {
    let b = name.as_bytes();
    if b.len() != 10 || b[4] != b'-' || b[7] != b'-' {
        return false;
    }
    NaiveDate::parse_from_str(name, "%Y-%m-%d").is_ok()
}

/// Day-directory name for a UTC instant.
pub fn day_dir_name(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

/// WAL root for an application root: `<root>/data/log.wal`.
pub fn wal_root(root: &Path) -> PathBuf {
    root.join("data").join("log.wal")
}

/// Per-node directory under the WAL root: `<root>/data/log.wal/node-<id>`.
pub fn node_dir(root: &Path, node_id: &str) -> PathBuf {
    wal_root(root).join(format!("node-{node_id}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn segment_base_format() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(segment_base("wal", at, 7), "wal-20240102T030405Z-007");
    }

    #[test]
    fn base_names_sort_chronologically() {
        let early = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 6).unwrap();
        assert!(segment_base("wal", early, 0) < segment_base("wal", late, 0));
        // Same second: the roll counter breaks the tie.
        assert!(segment_base("wal", early, 0) < segment_base("wal", early, 1));
    }

    #[test]
    fn index_to_segment_name() {
        assert_eq!(
            segment_file_for_index("wal-20240101T000000Z-000.wal.idx").as_deref(),
            Some("wal-20240101T000000Z-000.wal.gz")
        );
        assert_eq!(segment_file_for_index("wal-000.wal.gz"), None);
        assert_eq!(segment_file_for_index("notes.txt"), None);
    }

    #[test]
    fn day_dir_detection() {
        assert!(is_day_dir("2024-01-01"));
        assert!(is_day_dir("1999-12-31"));
        assert!(!is_day_dir("2024-13-01")); // no 13th month
        assert!(!is_day_dir("2024-02-30")); // not a real date
        assert!(!is_day_dir("2024-1-1"));
        assert!(!is_day_dir("20240101"));
        assert!(!is_day_dir("2024-01-01x"));
        assert!(!is_day_dir("node-abc"));
    }

    #[test]
    fn paths() {
        let root = Path::new("/srv/app");
        assert_eq!(wal_root(root), Path::new("/srv/app/data/log.wal"));
        assert_eq!(
            node_dir(root, "abc123"),
            Path::new("/srv/app/data/log.wal/node-abc123")
        );
    }
}
