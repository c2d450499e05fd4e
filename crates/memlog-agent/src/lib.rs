//! MemLog Tailing Agent
//!
//! Continuously ships decompressed log bytes from the newest WAL index in
//! the newest per-node day directory to a downstream sink. The agent is a
//! shipping pipeline, not a gatekeeper: per-frame integrity failures are
//! logged and counted, never fatal, and the downstream sink is the authority
//! on acceptance.
//!
//! The `memagent` binary in `src/bin` wraps [`Tailer`] with a CLI; stdout
//! carries the decompressed payload bytes, stderr carries metadata,
//! warnings, and errors.

pub mod error;
pub mod tailer;

pub use error::{Error, Result};
pub use tailer::{Tailer, TailerConfig};
