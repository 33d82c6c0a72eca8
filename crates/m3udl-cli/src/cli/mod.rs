//! CLI for m3udl: search a playlist, pick entries, download them.

mod download;
mod select;
mod signal;

use anyhow::Result;
use clap::Parser;
use m3udl_core::config;
use std::path::PathBuf;

/// Search an M3U playlist and download the matching entries.
#[derive(Debug, Parser)]
#[command(name = "m3udl")]
#[command(about = "Concurrent, resumable downloader for M3U playlist entries", long_about = None)]
pub struct Cli {
    /// Case-insensitive text to look for in channel ids and names.
    pub query: String,

    /// Playlist file to search.
    #[arg(short = 'm', long = "m3u", default_value = "chans.m3u", value_name = "PATH")]
    pub m3u: PathBuf,

    /// Download every match without the selection menu.
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Concurrent downloads (overrides config).
    #[arg(short = 'j', long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Retry passes for failed downloads (overrides config).
    #[arg(short = 'r', long, value_name = "N")]
    pub retries: Option<u32>,

    /// Directory for partial `.part` files (overrides config).
    #[arg(long, value_name = "DIR")]
    pub staging_dir: Option<PathBuf>,

    /// Where finished files are placed.
    #[arg(short = 'o', long, default_value = ".", value_name = "DIR")]
    pub output_dir: PathBuf,
}

/// Process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    /// At least one download failed after all retries.
    Failure,
    /// Stopped by Ctrl-C or SIGTERM.
    Interrupted,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Failure => 1,
            ExitStatus::Interrupted => 130,
        }
    }
}

pub async fn run_from_args() -> Result<ExitStatus> {
    let cli = Cli::parse();
    let mut cfg = config::load_or_init()?;
    tracing::debug!("loaded config: {:?}", cfg);

    if let Some(jobs) = cli.jobs {
        cfg.concurrency = jobs;
    }
    if let Some(retries) = cli.retries {
        cfg.max_retries = retries;
    }
    if let Some(dir) = &cli.staging_dir {
        cfg.staging_dir = dir.clone();
    }

    download::run_download(&cli, &cfg).await
}
