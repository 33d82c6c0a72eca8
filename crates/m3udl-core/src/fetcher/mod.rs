//! Resumable single-task fetcher.
//!
//! One call to [`Fetch::fetch`] performs one attempt: probe, skip-if-complete,
//! resume-or-restart the staging file, stream with progress sampling, then
//! move the staging file onto the target. Failures leave the staging file in
//! place so the next attempt (or the next run) can resume.

mod sample;
mod transfer;

pub use sample::ProgressSampler;

use std::time::Duration;

use curl::easy::Easy2;

use crate::control::AbortToken;
use crate::fetch_head;
use crate::progress::ProgressSink;
use crate::retry::FetchError;
use crate::storage::{self, ResumePlan, StagingFile};
use crate::task::DownloadTask;

use transfer::TransferHandler;

/// Below this rate for `low_speed_time`, curl gives up on the transfer.
const LOW_SPEED_LIMIT_BYTES: u32 = 1024;

/// Transfer tuning shared by every fetch in a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    /// Receive buffer size; curl delivers at most this many bytes per write.
    pub chunk_size: usize,
    pub connect_timeout: Duration,
    /// A transfer slower than 1 KiB/s for this long is treated as timed out.
    pub low_speed_time: Duration,
    /// Overall timeout for a metadata probe.
    pub probe_timeout: Duration,
    /// Minimum spacing between progress samples.
    pub sample_interval: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            chunk_size: 8192,
            connect_timeout: Duration::from_secs(15),
            low_speed_time: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(30),
            sample_interval: Duration::from_millis(100),
        }
    }
}

/// Successful result of one attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Target now holds the full download.
    Completed {
        /// Final file size.
        bytes: u64,
        /// Bytes received during this attempt (excludes the resumed prefix).
        session_bytes: u64,
        elapsed: Duration,
    },
    /// Target already existed with the remote size; nothing was transferred.
    Skipped,
}

impl FetchOutcome {
    /// Average throughput of this attempt in bytes per second.
    pub fn session_rate(&self) -> f64 {
        match self {
            FetchOutcome::Completed {
                session_bytes,
                elapsed,
                ..
            } => {
                let secs = elapsed.as_secs_f64();
                if secs > 0.0 {
                    *session_bytes as f64 / secs
                } else {
                    0.0
                }
            }
            FetchOutcome::Skipped => 0.0,
        }
    }
}

/// Performs one transfer attempt for a task, reporting progress samples to `sink`.
///
/// Implementations block; the scheduler runs them on blocking worker threads.
pub trait Fetch: Send + Sync {
    fn fetch(
        &self,
        task: &DownloadTask,
        sink: &dyn ProgressSink,
        abort: &AbortToken,
    ) -> Result<FetchOutcome, FetchError>;
}

/// libcurl-backed HTTP fetcher.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    options: FetchOptions,
}

impl HttpFetcher {
    pub fn new(options: FetchOptions) -> Self {
        Self { options }
    }
}

impl Fetch for HttpFetcher {
    fn fetch(
        &self,
        task: &DownloadTask,
        sink: &dyn ProgressSink,
        abort: &AbortToken,
    ) -> Result<FetchOutcome, FetchError> {
        if abort.is_aborted() {
            return Err(FetchError::Cancelled);
        }

        let head = fetch_head::probe(&task.url, &self.options, abort)?;
        if abort.is_aborted() {
            return Err(FetchError::Cancelled);
        }
        let total = head.content_length.unwrap_or(0);

        if total > 0 && storage::file_size(&task.target_path) == Some(total) {
            tracing::info!(
                task = task.id,
                target = %task.target_path.display(),
                "target already complete, skipping"
            );
            return Ok(FetchOutcome::Skipped);
        }

        let local = StagingFile::ensure_exists(&task.staging_path)?;
        let plan = ResumePlan::choose(local, total, head.accept_ranges);
        tracing::debug!(
            task = task.id,
            total,
            local,
            accept_ranges = head.accept_ranges,
            ?plan,
            "starting transfer"
        );
        let staging = StagingFile::open(&task.staging_path, plan)?;
        let sampler = ProgressSampler::new(total, plan.offset(), self.options.sample_interval);
        let handler = TransferHandler::new(task.id, staging, plan, sampler, sink, abort);

        let mut easy = Easy2::new(handler);
        easy.url(&task.url)?;
        easy.follow_location(true)?;
        easy.connect_timeout(self.options.connect_timeout)?;
        easy.low_speed_limit(LOW_SPEED_LIMIT_BYTES)?;
        easy.low_speed_time(self.options.low_speed_time)?;
        easy.buffer_size(self.options.chunk_size.clamp(1024, 512 * 1024))?;
        easy.progress(true)?;
        if let ResumePlan::Resume { offset } = plan {
            easy.range(&format!("{offset}-"))?;
        }

        let performed = easy.perform();
        let response_code = easy.response_code().unwrap_or(0);
        let handler = easy.get_mut();

        if handler.cancelled() || abort.is_aborted() {
            tracing::info!(task = task.id, "transfer interrupted, staging file kept");
            return Err(FetchError::Cancelled);
        }
        if let Some(code) = handler.rejected_status() {
            return Err(FetchError::Server(code));
        }
        if let Some(e) = handler.take_io_error() {
            return Err(FetchError::Storage(e));
        }
        performed?;
        if !handler.saw_body() && !(200..300).contains(&response_code) {
            return Err(FetchError::Server(response_code));
        }

        let session_bytes = handler.sampler().session_bytes();
        let elapsed = handler.sampler().elapsed();
        let staging = handler
            .take_staging()
            .ok_or_else(|| std::io::Error::other("staging file already closed"))?;
        let received = staging.len();
        if total > 0 && received != total {
            tracing::warn!(task = task.id, expected = total, received, "size mismatch");
            return Err(FetchError::SizeMismatch {
                expected: total,
                received,
            });
        }

        let staging_path = staging.close()?;
        storage::finalize(&staging_path, &task.target_path)?;
        tracing::info!(
            task = task.id,
            bytes = received,
            session_bytes,
            target = %task.target_path.display(),
            "download complete"
        );
        Ok(FetchOutcome::Completed {
            bytes: received,
            session_bytes,
            elapsed,
        })
    }
}
