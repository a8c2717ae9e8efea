//! # vackup
//!
//! Back up and restore Docker volumes. Volumes can be exported to and imported
//! from gzip'ed tarballs on the host, or saved into and loaded from container
//! images. All copying happens inside short-lived helper containers; this crate
//! only validates inputs, drives the engine CLI and reports the outcome.
//!
//! ## Example
//!
//! ```no_run
//! use vackup::{config::Config, core::VolumeTransfer};
//!
//! let transfer = VolumeTransfer::new(Config::from_env());
//! transfer.export("my-volume", "backup.tar.gz")?;
//! transfer.import("backup.tar.gz", "my-volume-copy")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod utils;

use anyhow::Result;
use std::io::IsTerminal;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging on stderr with appropriate verbosity
///
/// `RUST_LOG` takes precedence over the `--debug` flag when set.
pub fn setup_logging(debug: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(std::io::stderr().is_terminal())
                .with_target(false)
                .with_level(true)
                .compact(),
        )
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
