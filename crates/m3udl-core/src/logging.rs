//! Logging init: a log file under the XDG state dir, or stderr as a fallback.
//!
//! The terminal belongs to the progress panel, so nothing is logged to stdout.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset and logging goes to the file.
const FILE_FILTER: &str = "info,m3udl=debug,m3udl_core=debug";
/// Stderr shares the terminal with the panel; keep it quiet.
const STDERR_FILTER: &str = "warn";

/// `$XDG_STATE_HOME/m3udl/m3udl.log`, creating the directory if needed.
pub fn log_file_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("m3udl")?;
    let path = xdg_dirs
        .place_state_file("m3udl.log")
        .context("failed to create log directory")?;
    Ok(path)
}

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Initialize structured logging to the state-dir log file and return its path.
/// Returns Err (e.g. unwritable state dir) so the caller can fall back to stderr.
pub fn init_logging() -> Result<PathBuf> {
    let path = log_file_path()?;
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(FILE_FILTER))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("install subscriber: {}", e))?;

    tracing::info!(path = %path.display(), "m3udl logging initialized");
    Ok(path)
}

/// Warnings and errors to stderr only. Use when `init_logging` fails so the
/// CLI keeps running.
pub fn init_logging_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(STDERR_FILTER))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}
