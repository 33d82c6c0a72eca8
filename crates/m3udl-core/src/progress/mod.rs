//! Progress sink: per-task transfer state plus the in-place terminal panel.
//!
//! Fetchers push [`TransferEvent`]s through the [`ProgressSink`] trait. The
//! [`ProgressPanel`] keeps one [`TransferState`] per task and redraws the
//! whole panel under the same lock that guards the state map, so concurrent
//! reports never interleave their terminal output.

mod event;
mod panel;
mod render;
mod state;
mod viewport;

pub use event::{ProgressSample, TransferEvent};
pub use panel::{PanelOptions, ProgressPanel};
pub use state::{StatusStyle, TransferState, TransferStatus};
pub use viewport::{TerminalViewport, Viewport};

use crate::task::TaskId;

/// Write side of progress reporting. Shared across worker threads.
pub trait ProgressSink: Send + Sync {
    /// Adds a task in the Queued state. Called once per task before scheduling.
    fn register(&self, id: TaskId, display_name: &str);

    /// Applies one event to the task's state.
    fn report(&self, id: TaskId, event: TransferEvent);
}

/// Discards everything. For headless runs and tests that don't inspect progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn register(&self, _id: TaskId, _display_name: &str) {}

    fn report(&self, _id: TaskId, _event: TransferEvent) {}
}
