//! `m3udl <QUERY>`: search, size probe, selection, batch download.

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use m3udl_core::config::M3udlConfig;
use m3udl_core::control::AbortToken;
use m3udl_core::fetch_head;
use m3udl_core::fetcher::{FetchOptions, HttpFetcher};
use m3udl_core::format::format_size;
use m3udl_core::naming;
use m3udl_core::playlist::{self, PlaylistEntry};
use m3udl_core::progress::ProgressPanel;
use m3udl_core::scheduler::{self, BatchOptions, BatchSummary, TaskOutcome};

use super::{select, signal, Cli, ExitStatus};

/// Panel refresh cadence between progress reports (drives name scrolling).
const PANEL_TICK: Duration = Duration::from_millis(300);

pub async fn run_download(cli: &Cli, cfg: &M3udlConfig) -> Result<ExitStatus> {
    let entries = playlist::load_m3u(&cli.m3u)?;
    let matches = playlist::search(&entries, &cli.query)?;
    tracing::info!(query = %cli.query, matches = matches.len(), "search finished");
    if matches.is_empty() {
        println!("No downloadable entries match \"{}\".", cli.query);
        return Ok(ExitStatus::Success);
    }

    let fetch_options = cfg.fetch_options();
    let matches = probe_sizes(matches, fetch_options.clone()).await?;

    let selected = if cli.yes {
        matches
    } else {
        let to_show = matches.clone();
        match tokio::task::spawn_blocking(move || select::choose(&to_show))
            .await
            .context("selection menu join")??
        {
            Some(selected) => selected,
            None => {
                println!("Cancelled.");
                return Ok(ExitStatus::Success);
            }
        }
    };

    let total: u64 = selected.iter().filter_map(|e| e.size).sum();
    println!(
        "Total volume to be downloaded: {} ({} file(s))",
        format_size(total),
        selected.len()
    );

    std::fs::create_dir_all(&cfg.staging_dir).with_context(|| {
        format!("failed to create staging dir {}", cfg.staging_dir.display())
    })?;
    let tasks = naming::plan_tasks(&selected, &cli.output_dir, &cfg.staging_dir);

    let abort = AbortToken::new();
    let listener = signal::spawn_interrupt_listener(abort.clone());
    let panel = Arc::new(ProgressPanel::stdout(cfg.panel_options()));
    let ticker = {
        let panel = Arc::clone(&panel);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(PANEL_TICK);
            loop {
                interval.tick().await;
                panel.tick();
            }
        })
    };

    let options = BatchOptions {
        concurrency: cfg.concurrency,
        retry: cfg.retry_policy(),
    };
    let summary = scheduler::run_batch(
        tasks,
        options,
        Arc::new(HttpFetcher::new(fetch_options)),
        panel.clone(),
        abort,
    )
    .await;

    ticker.abort();
    listener.abort();
    panel.finish();
    print_summary(&summary, &panel);

    Ok(exit_status(&summary))
}

/// Fills in `size` for every entry, printing an inline percentage.
async fn probe_sizes(entries: Vec<PlaylistEntry>, options: FetchOptions) -> Result<Vec<PlaylistEntry>> {
    tokio::task::spawn_blocking(move || {
        let total = entries.len();
        let mut out = io::stdout();
        let mut sized = Vec::with_capacity(total);
        for (i, mut entry) in entries.into_iter().enumerate() {
            let _ = write!(out, "\rChecking sizes... {:3}%", i * 100 / total);
            let _ = out.flush();
            let size = fetch_head::remote_size(&entry.url, &options);
            entry.size = (size > 0).then_some(size);
            sized.push(entry);
        }
        let _ = writeln!(out, "\rChecking sizes... 100%");
        sized
    })
    .await
    .context("size probe join")
}

fn print_summary(summary: &BatchSummary, panel: &ProgressPanel) {
    println!(
        "{} completed, {} skipped, {} failed{}",
        summary.completed(),
        summary.skipped(),
        summary.failed(),
        if summary.interrupted { " (interrupted)" } else { "" }
    );
    for (id, state) in panel.states() {
        if let Some(TaskOutcome::Failed { reason, attempts }) = summary.outcome(id) {
            println!("  {}: {} after {} attempt(s)", state.display_name, reason, attempts);
        }
    }
}

fn exit_status(summary: &BatchSummary) -> ExitStatus {
    if summary.interrupted {
        ExitStatus::Interrupted
    } else if summary.is_success() {
        ExitStatus::Success
    } else {
        ExitStatus::Failure
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_status_from_summary() {
        let mut s = BatchSummary::default();
        s.record(1, TaskOutcome::Completed { bytes: 1 });
        assert_eq!(exit_status(&s), ExitStatus::Success);
        s.record(
            2,
            TaskOutcome::Failed {
                reason: "HTTP 404".to_string(),
                attempts: 2,
            },
        );
        assert_eq!(exit_status(&s), ExitStatus::Failure);
        s.interrupted = true;
        assert_eq!(exit_status(&s), ExitStatus::Interrupted);
    }
}
