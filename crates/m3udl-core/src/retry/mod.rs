//! Transfer error taxonomy and retry policy.
//!
//! Fetcher errors are classified into kinds so the scheduler can decide
//! whether a failed task is retried. Every kind except cancellation is
//! recoverable from the scheduler's point of view.

mod classify;
mod error;
mod policy;

pub use classify::{classify_curl_error, classify_http_status, ErrorKind};
pub use error::FetchError;
pub use policy::{RetryDecision, RetryPolicy};
