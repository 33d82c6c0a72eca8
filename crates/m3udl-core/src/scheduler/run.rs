//! Main pass: bounded pool, first-completed-first-handled.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::task::JoinSet;

use crate::control::AbortToken;
use crate::fetcher::{Fetch, FetchOutcome};
use crate::format::format_rate;
use crate::progress::{ProgressSink, TransferEvent};
use crate::retry::{FetchError, RetryPolicy};
use crate::task::DownloadTask;

use super::retry_phase::{run_retry_phase, RetryRecord};
use super::slots::ConcurrencyLimiter;
use super::summary::{BatchSummary, TaskOutcome};

/// Reason shown for tasks stopped by an interrupt.
pub(super) const INTERRUPTED: &str = "interrupted";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Initial (and maximum) number of concurrent transfers.
    pub concurrency: usize,
    pub retry: RetryPolicy,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            retry: RetryPolicy::default(),
        }
    }
}

/// Everything a worker needs besides its task.
#[derive(Clone)]
pub(super) struct WorkerContext {
    pub(super) fetcher: Arc<dyn Fetch>,
    pub(super) sink: Arc<dyn ProgressSink>,
    pub(super) abort: AbortToken,
    pub(super) policy: RetryPolicy,
}

impl WorkerContext {
    /// Blocking: one fetch attempt.
    pub(super) fn attempt(&self, task: &DownloadTask) -> Result<FetchOutcome, FetchError> {
        self.fetcher.fetch(task, self.sink.as_ref(), &self.abort)
    }

    /// Reports a successful attempt and returns its summary outcome.
    pub(super) fn report_success(&self, task: &DownloadTask, outcome: &FetchOutcome) -> TaskOutcome {
        match outcome {
            FetchOutcome::Completed { bytes, .. } => {
                let rate = format_rate(outcome.session_rate());
                self.sink.report(task.id, TransferEvent::Completed { rate });
                TaskOutcome::Completed { bytes: *bytes }
            }
            FetchOutcome::Skipped => {
                self.sink.report(task.id, TransferEvent::Skipped);
                TaskOutcome::Skipped
            }
        }
    }

    pub(super) fn report_failure(&self, task: &DownloadTask, reason: &str, is_final: bool) {
        self.sink.report(
            task.id,
            TransferEvent::Failed {
                reason: reason.to_string(),
                is_final,
            },
        );
    }
}

/// Runs every task to a final outcome.
///
/// All tasks are registered with `sink` up front. The returned summary holds
/// exactly one outcome per task.
pub async fn run_batch(
    tasks: Vec<DownloadTask>,
    options: BatchOptions,
    fetcher: Arc<dyn Fetch>,
    sink: Arc<dyn ProgressSink>,
    abort: AbortToken,
) -> BatchSummary {
    for task in &tasks {
        sink.register(task.id, &task.display_name());
    }
    let ids: Vec<_> = tasks.iter().map(|t| t.id).collect();
    let ctx = WorkerContext {
        fetcher,
        sink,
        abort,
        policy: options.retry,
    };

    let mut summary = BatchSummary::default();
    let mut limiter = ConcurrencyLimiter::new(options.concurrency);
    let retries = main_pass(tasks, &ctx, &mut limiter, &mut summary).await;
    summary.concurrency_after_main_pass = limiter.current();
    tracing::info!(
        initial = limiter.initial(),
        current = limiter.current(),
        failed = retries.len(),
        "main pass finished"
    );

    if ctx.abort.is_aborted() {
        summary.interrupted = true;
        for record in retries {
            ctx.report_failure(&record.task, INTERRUPTED, true);
            summary.record(record.task.id, TaskOutcome::Cancelled);
        }
    } else {
        run_retry_phase(retries, &ctx, &mut summary).await;
    }

    // A worker that panicked never reported back.
    for id in ids {
        if summary.outcome(id).is_none() {
            let reason = "worker stopped unexpectedly".to_string();
            ctx.sink.report(
                id,
                TransferEvent::Failed {
                    reason: reason.clone(),
                    is_final: true,
                },
            );
            summary.record(id, TaskOutcome::Failed { reason, attempts: 1 });
        }
    }
    summary
}

async fn main_pass(
    tasks: Vec<DownloadTask>,
    ctx: &WorkerContext,
    limiter: &mut ConcurrencyLimiter,
    summary: &mut BatchSummary,
) -> Vec<RetryRecord> {
    let mut queue: VecDeque<DownloadTask> = tasks.into();
    let mut retries = Vec::new();
    let mut join_set = JoinSet::new();

    loop {
        while !ctx.abort.is_aborted() && limiter.has_free_slot() {
            let Some(task) = queue.pop_front() else {
                break;
            };
            limiter.acquire();
            tracing::debug!(task = task.id, in_flight = limiter.in_flight(), "submitting");
            let worker = ctx.clone();
            join_set.spawn_blocking(move || {
                let result = worker.attempt(&task);
                (task, result)
            });
        }

        let Some(joined) = join_set.join_next().await else {
            break;
        };
        let (task, result) = match joined {
            Ok(pair) => pair,
            Err(e) => {
                tracing::error!(error = %e, "download worker panicked");
                limiter.release_failure();
                continue;
            }
        };

        match result {
            Ok(outcome) => {
                limiter.release_success();
                let outcome = ctx.report_success(&task, &outcome);
                tracing::info!(task = task.id, ?outcome, "task finished");
                summary.record(task.id, outcome);
            }
            Err(FetchError::Cancelled) => {
                limiter.release_cancelled();
                ctx.report_failure(&task, INTERRUPTED, true);
                summary.record(task.id, TaskOutcome::Cancelled);
            }
            Err(e) => {
                limiter.release_failure();
                let reason = e.to_string();
                let is_final = ctx.policy.is_final_attempt(0);
                tracing::warn!(
                    task = task.id,
                    kind = ?e.kind(),
                    error = %reason,
                    concurrency = limiter.current(),
                    "attempt failed"
                );
                ctx.report_failure(&task, &reason, is_final);
                if is_final {
                    summary.record(task.id, TaskOutcome::Failed { reason, attempts: 1 });
                } else {
                    retries.push(RetryRecord {
                        task,
                        attempts: 1,
                        last_kind: e.kind(),
                        last_reason: reason,
                    });
                }
            }
        }
    }

    // Interrupted before these were submitted.
    for task in queue {
        ctx.report_failure(&task, INTERRUPTED, true);
        summary.record(task.id, TaskOutcome::Cancelled);
    }
    retries
}
