//! Sequential retry passes after the main pass.

use std::time::Duration;

use crate::control::AbortToken;
use crate::retry::{ErrorKind, FetchError, RetryDecision};
use crate::task::DownloadTask;

use super::run::{WorkerContext, INTERRUPTED};
use super::summary::{BatchSummary, TaskOutcome};

/// Abort is polled at least this often while waiting out a retry delay.
const ABORT_POLL: Duration = Duration::from_millis(100);

/// A failed task waiting for another attempt.
#[derive(Debug, Clone)]
pub(super) struct RetryRecord {
    pub(super) task: DownloadTask,
    /// Attempts made so far, including the initial try.
    pub(super) attempts: u32,
    pub(super) last_kind: ErrorKind,
    pub(super) last_reason: String,
}

/// Sleeps for `delay`, returning early (false) if `abort` trips.
async fn sleep_unless_aborted(delay: Duration, abort: &AbortToken) -> bool {
    let mut remaining = delay;
    while !remaining.is_zero() {
        if abort.is_aborted() {
            return false;
        }
        let step = remaining.min(ABORT_POLL);
        tokio::time::sleep(step).await;
        remaining -= step;
    }
    !abort.is_aborted()
}

/// Up to `max_retries` passes; each pass retries the remaining failures one
/// at a time. Every task ends with exactly one outcome in `summary`.
pub(super) async fn run_retry_phase(
    mut pending: Vec<RetryRecord>,
    ctx: &WorkerContext,
    summary: &mut BatchSummary,
) {
    let mut pass = 0;
    while !pending.is_empty() && pass < ctx.policy.max_retries {
        pass += 1;
        tracing::info!(pass, tasks = pending.len(), "retry pass");
        let mut still_failing = Vec::new();

        for record in pending {
            if ctx.abort.is_aborted() {
                summary.interrupted = true;
                ctx.report_failure(&record.task, INTERRUPTED, true);
                summary.record(record.task.id, TaskOutcome::Cancelled);
                continue;
            }
            let delay = match ctx.policy.decide(record.attempts - 1, record.last_kind) {
                RetryDecision::RetryAfter(delay) => delay,
                RetryDecision::NoRetry => {
                    give_up(record, ctx, summary);
                    continue;
                }
            };
            if !sleep_unless_aborted(delay, &ctx.abort).await {
                summary.interrupted = true;
                ctx.report_failure(&record.task, INTERRUPTED, true);
                summary.record(record.task.id, TaskOutcome::Cancelled);
                continue;
            }
            if let Some(record) = retry_once(record, ctx, summary).await {
                still_failing.push(record);
            }
        }
        pending = still_failing;
    }

    // Anything left has used up its passes.
    for record in pending {
        give_up(record, ctx, summary);
    }
}

/// Runs attempt number `record.attempts` (0 = initial). Returns the record
/// again when the task failed and may be retried.
async fn retry_once(
    record: RetryRecord,
    ctx: &WorkerContext,
    summary: &mut BatchSummary,
) -> Option<RetryRecord> {
    let attempt = record.attempts;
    let task = record.task.clone();
    let worker = ctx.clone();
    tracing::debug!(task = task.id, attempt, "retrying");
    let joined = tokio::task::spawn_blocking(move || {
        let result = worker.attempt(&task);
        (task, result)
    })
    .await;

    let (task, result) = match joined {
        Ok(pair) => pair,
        Err(e) => {
            tracing::error!(task = record.task.id, error = %e, "retry worker panicked");
            let reason = format!("worker stopped unexpectedly: {e}");
            ctx.report_failure(&record.task, &reason, true);
            summary.record(
                record.task.id,
                TaskOutcome::Failed {
                    reason,
                    attempts: attempt + 1,
                },
            );
            return None;
        }
    };

    match result {
        Ok(outcome) => {
            let outcome = ctx.report_success(&task, &outcome);
            tracing::info!(task = task.id, attempt, ?outcome, "retry succeeded");
            summary.record(task.id, outcome);
            None
        }
        Err(FetchError::Cancelled) => {
            summary.interrupted = true;
            ctx.report_failure(&task, INTERRUPTED, true);
            summary.record(task.id, TaskOutcome::Cancelled);
            None
        }
        Err(e) => {
            let reason = e.to_string();
            let is_final = ctx.policy.is_final_attempt(attempt);
            tracing::warn!(task = task.id, attempt, kind = ?e.kind(), error = %reason, is_final, "retry failed");
            ctx.report_failure(&task, &reason, is_final);
            if is_final {
                summary.record(
                    task.id,
                    TaskOutcome::Failed {
                        reason,
                        attempts: attempt + 1,
                    },
                );
                None
            } else {
                Some(RetryRecord {
                    task,
                    attempts: attempt + 1,
                    last_kind: e.kind(),
                    last_reason: reason,
                })
            }
        }
    }
}

fn give_up(record: RetryRecord, ctx: &WorkerContext, summary: &mut BatchSummary) {
    ctx.report_failure(&record.task, &record.last_reason, true);
    summary.record(
        record.task.id,
        TaskOutcome::Failed {
            reason: record.last_reason,
            attempts: record.attempts,
        },
    );
}
