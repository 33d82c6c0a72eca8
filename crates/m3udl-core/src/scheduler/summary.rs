use std::collections::BTreeMap;

use crate::task::TaskId;

/// Final status of one task after the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed { bytes: u64 },
    Skipped,
    /// Failed on the last permitted attempt.
    Failed { reason: String, attempts: u32 },
    /// Interrupted, or never started because of an interrupt.
    Cancelled,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub outcomes: BTreeMap<TaskId, TaskOutcome>,
    /// An interrupt stopped the batch.
    pub interrupted: bool,
    /// Concurrency limit left after the main pass's failures.
    pub concurrency_after_main_pass: usize,
}

impl BatchSummary {
    pub fn record(&mut self, id: TaskId, outcome: TaskOutcome) {
        self.outcomes.insert(id, outcome);
    }

    pub fn outcome(&self, id: TaskId) -> Option<&TaskOutcome> {
        self.outcomes.get(&id)
    }

    pub fn completed(&self) -> usize {
        self.count(|o| matches!(o, TaskOutcome::Completed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, TaskOutcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, TaskOutcome::Failed { .. }))
    }

    pub fn cancelled(&self) -> usize {
        self.count(|o| matches!(o, TaskOutcome::Cancelled))
    }

    /// True when nothing failed finally and the batch was not interrupted.
    pub fn is_success(&self) -> bool {
        !self.interrupted && self.failed() == 0 && self.cancelled() == 0
    }

    fn count(&self, pred: impl Fn(&TaskOutcome) -> bool) -> usize {
        self.outcomes.values().filter(|o| pred(o)).count()
    }
}
