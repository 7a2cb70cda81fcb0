//! Logger setup helpers for binaries and tests that embed the client

use anyhow::{Context, Result};
use std::path::Path;

/// Route `log` output to a file, truncated on each run. The filter comes
/// from `RUST_LOG`, as with any `env_logger` setup.
pub fn init_file_logger(path: &Path) -> Result<()> {
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .try_init()
        .context("A logger is already installed")
}

/// Log to stderr; safe to call more than once
pub fn init() {
    let _ = env_logger::Builder::from_default_env().try_init();
}
