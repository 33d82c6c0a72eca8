#![allow(dead_code)]

pub mod range_server;

use std::sync::Mutex;

use m3udl_core::control::AbortToken;
use m3udl_core::progress::{ProgressSink, TransferEvent};
use m3udl_core::TaskId;

/// Sink that records every event, optionally tripping an abort token on the
/// first progress sample.
#[derive(Default)]
pub struct RecordingSink {
    pub registered: Mutex<Vec<(TaskId, String)>>,
    pub events: Mutex<Vec<(TaskId, TransferEvent)>>,
    pub abort_on_progress: Option<AbortToken>,
}

impl RecordingSink {
    pub fn aborting(token: AbortToken) -> Self {
        Self {
            abort_on_progress: Some(token),
            ..Self::default()
        }
    }

    pub fn events_for(&self, id: TaskId) -> Vec<TransferEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(i, _)| *i == id)
            .map(|(_, e)| e.clone())
            .collect()
    }

    pub fn percents(&self, id: TaskId) -> Vec<f64> {
        self.events_for(id)
            .into_iter()
            .filter_map(|e| match e {
                TransferEvent::Progress(s) => s.percent,
                _ => None,
            })
            .collect()
    }

    /// Terminal events only (no progress samples).
    pub fn status_reports(&self, id: TaskId) -> Vec<TransferEvent> {
        self.events_for(id)
            .into_iter()
            .filter(|e| !matches!(e, TransferEvent::Progress(_)))
            .collect()
    }
}

impl ProgressSink for RecordingSink {
    fn register(&self, id: TaskId, display_name: &str) {
        self.registered
            .lock()
            .unwrap()
            .push((id, display_name.to_string()));
    }

    fn report(&self, id: TaskId, event: TransferEvent) {
        if let (Some(token), TransferEvent::Progress(_)) = (&self.abort_on_progress, &event) {
            token.abort();
        }
        self.events.lock().unwrap().push((id, event));
    }
}
