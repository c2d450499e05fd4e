//! memagent - Tail the MemLog WAL and Relay Decompressed Bytes
//!
//! Follows the newest index under `<root>/data/log.wal/node-<id>/`, gzip-
//! decompresses each frame, and writes the raw payload bytes to stdout.
//! Metadata (`--meta`), warnings, and errors go to stderr via `tracing`.
//!
//! # Example
//!
//! ```bash
//! # Drain everything currently on disk, verifying checksums:
//! memagent --root /srv/app --node abc123 --once --verify
//!
//! # Follow live, printing per-frame metadata:
//! memagent --root /srv/app --node abc123 --meta --poll 250 > app.jsonl
//! ```
//!
//! Exit status is non-zero on startup failures (missing node or day
//! directory) and, in `--once` mode, when any frame failed verification.

use anyhow::bail;
use clap::Parser;
use memlog_agent::{Tailer, TailerConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "memagent")]
#[command(about = "Tail the MemLog WAL and relay decompressed log bytes", long_about = None)]
struct Cli {
    /// Application root; the WAL lives under <root>/data/log.wal/
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Producer node ID (selects node-<id>/)
    #[arg(long)]
    node: String,

    /// Process currently-available frames and exit
    #[arg(long)]
    once: bool,

    /// Verify CRC-32 and record counts of decompressed frames
    #[arg(long)]
    verify: bool,

    /// Emit per-frame metadata on stderr before each frame's bytes
    #[arg(long)]
    meta: bool,

    /// Idle polling interval in milliseconds
    #[arg(long, default_value = "500", value_name = "MILLIS")]
    poll: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Side channel on stderr; stdout is reserved for payload bytes.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let once = cli.once;
    let mut tailer = Tailer::new(TailerConfig {
        root: cli.root,
        node_id: cli.node,
        once,
        verify: cli.verify,
        emit_meta: cli.meta,
        poll: Duration::from_millis(cli.poll),
    });

    let mut stdout = tokio::io::stdout();

    if once {
        tailer.run(&mut stdout).await?;
    } else {
        tokio::select! {
            result = tailer.run(&mut stdout) => result?,
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
            }
        }
    }

    if tailer.frame_errors() > 0 {
        bail!("{} frame(s) failed verification or shipping", tailer.frame_errors());
    }
    Ok(())
}
