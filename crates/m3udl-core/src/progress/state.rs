//! Per-task display state and the status rendering table.

use crossterm::style::Color;

use super::event::TransferEvent;
use crate::format::format_size;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferStatus {
    Queued,
    Downloading,
    Completed,
    Failed,
    Skipped,
}

/// How the label and bar of a status are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusStyle {
    /// Percent label, bar colored by percent thresholds.
    Percent,
    /// Fixed label and color; `full_bar` draws a complete bar.
    Label {
        label: &'static str,
        color: Color,
        full_bar: bool,
    },
}

impl TransferStatus {
    pub fn style(self) -> StatusStyle {
        match self {
            TransferStatus::Downloading | TransferStatus::Completed => StatusStyle::Percent,
            TransferStatus::Queued => StatusStyle::Label {
                label: "QUEUED",
                color: Color::DarkGrey,
                full_bar: false,
            },
            TransferStatus::Failed => StatusStyle::Label {
                label: "FAILED",
                color: Color::Red,
                full_bar: false,
            },
            TransferStatus::Skipped => StatusStyle::Label {
                label: "SKIPPED",
                color: Color::Cyan,
                full_bar: true,
            },
        }
    }

    /// Display group: active first, then waiting, then finished.
    pub fn sort_rank(self) -> u8 {
        match self {
            TransferStatus::Downloading => 0,
            TransferStatus::Queued => 1,
            TransferStatus::Completed | TransferStatus::Failed | TransferStatus::Skipped => 2,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.sort_rank() == 2
    }
}

/// Bar color for a percentage.
pub fn percent_color(percent: f64) -> Color {
    if percent < 33.0 {
        Color::Red
    } else if percent < 66.0 {
        Color::Yellow
    } else if percent < 100.0 {
        Color::Blue
    } else {
        Color::Green
    }
}

/// Display state of one task. Retained after the task finishes.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferState {
    pub display_name: String,
    /// `None` when not downloading or when the size is unknown.
    pub percent: Option<f64>,
    pub bytes: u64,
    pub rate: String,
    pub eta: String,
    pub status: TransferStatus,
    /// Horizontal scroll position for names wider than the name column.
    pub scroll_offset: usize,
    /// Last failure reason, kept for the final summary.
    pub reason: Option<String>,
}

impl TransferState {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            percent: None,
            bytes: 0,
            rate: String::new(),
            eta: String::new(),
            status: TransferStatus::Queued,
            scroll_offset: 0,
            reason: None,
        }
    }

    pub fn apply(&mut self, event: TransferEvent) {
        match event {
            TransferEvent::Progress(sample) => {
                let was_downloading = self.status == TransferStatus::Downloading;
                self.status = TransferStatus::Downloading;
                self.percent = match (sample.percent, self.percent) {
                    (Some(new), Some(old)) if was_downloading => Some(new.max(old)),
                    (new, _) => new,
                };
                self.bytes = sample.downloaded;
                self.rate = sample.rate;
                self.eta = if self.percent.is_some() {
                    sample.eta
                } else {
                    format_size(sample.downloaded)
                };
            }
            TransferEvent::Completed { rate } => {
                self.status = TransferStatus::Completed;
                self.percent = Some(100.0);
                self.rate = rate;
                self.eta.clear();
                self.reason = None;
            }
            TransferEvent::Skipped => {
                self.status = TransferStatus::Skipped;
                self.percent = None;
                self.rate.clear();
                self.eta.clear();
            }
            TransferEvent::Failed { reason, is_final } => {
                self.status = if is_final {
                    TransferStatus::Failed
                } else {
                    TransferStatus::Queued
                };
                self.percent = None;
                self.rate.clear();
                self.eta.clear();
                self.reason = Some(reason);
            }
        }
    }
}
