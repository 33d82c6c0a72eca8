//! Batch scheduler.
//!
//! Runs a main pass over all tasks on a bounded pool of blocking workers,
//! shrinking the pool by one slot per failure, then retries failed tasks one
//! at a time with a fixed delay. An interrupt stops submission, cancels
//! in-flight transfers, and skips the retry phase.

mod retry_phase;
mod run;
mod slots;
mod summary;

pub use run::{run_batch, BatchOptions};
pub use slots::ConcurrencyLimiter;
pub use summary::{BatchSummary, TaskOutcome};
