/// One throttled emission of progress for an active transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSample {
    /// 0..=100, or `None` when the remote size is unknown.
    pub percent: Option<f64>,
    /// Bytes in the staging file, including any resumed prefix.
    pub downloaded: u64,
    /// Formatted throughput of the current attempt.
    pub rate: String,
    /// Formatted remaining time, or the unknown sentinel.
    pub eta: String,
}

/// State transition pushed into a [`super::ProgressSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum TransferEvent {
    Progress(ProgressSample),
    Completed { rate: String },
    /// Target already complete; nothing transferred.
    Skipped,
    /// A failed attempt. Non-final failures are shown as queued for retry.
    Failed { reason: String, is_final: bool },
}

impl TransferEvent {
    /// Completion-like events bypass the redraw throttle.
    pub fn forces_redraw(&self) -> bool {
        !matches!(self, TransferEvent::Progress(_))
    }
}
