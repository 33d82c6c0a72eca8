//! Throttled, in-place terminal panel.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crossterm::cursor::MoveToPreviousLine;
use crossterm::queue;
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};

use super::event::TransferEvent;
use super::render;
use super::state::{TransferState, TransferStatus};
use super::viewport::{TerminalViewport, Viewport};
use super::ProgressSink;
use crate::task::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelOptions {
    /// Minimum spacing between redraws while something is downloading.
    pub redraw_interval: Duration,
    /// Spacing between scroll steps of long names.
    pub scroll_interval: Duration,
    /// Terminal lines left free below the panel.
    pub margin: u16,
}

impl Default for PanelOptions {
    fn default() -> Self {
        Self {
            redraw_interval: Duration::from_millis(100),
            scroll_interval: Duration::from_millis(300),
            margin: 3,
        }
    }
}

struct PanelInner {
    states: BTreeMap<TaskId, TransferState>,
    out: Box<dyn Write + Send>,
    viewport: Box<dyn Viewport>,
    options: PanelOptions,
    last_draw: Option<Instant>,
    last_scroll: Instant,
    /// Lines written by the previous redraw; the cursor sits just below them.
    prev_lines: usize,
    last_width: Option<u16>,
}

/// Multi-line progress display. State updates and the redraw that follows
/// happen under one lock.
pub struct ProgressPanel {
    inner: Mutex<PanelInner>,
}

impl ProgressPanel {
    /// Panel on stdout, sized from the real terminal.
    pub fn stdout(options: PanelOptions) -> Self {
        Self::new(Box::new(io::stdout()), Box::new(TerminalViewport), options)
    }

    pub fn new(out: Box<dyn Write + Send>, viewport: Box<dyn Viewport>, options: PanelOptions) -> Self {
        Self {
            inner: Mutex::new(PanelInner {
                states: BTreeMap::new(),
                out,
                viewport,
                options,
                last_draw: None,
                last_scroll: Instant::now(),
                prev_lines: 0,
                last_width: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PanelInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Advances name scrolling when due and redraws subject to the throttle.
    /// Driven by a periodic ticker so names keep moving between reports.
    pub fn tick(&self) {
        self.lock().update(false);
    }

    /// Unthrottled redraw, for the final frame.
    pub fn finish(&self) {
        self.lock().update(true);
    }

    pub fn snapshot(&self, id: TaskId) -> Option<TransferState> {
        self.lock().states.get(&id).cloned()
    }

    /// Every state in display order.
    pub fn states(&self) -> Vec<(TaskId, TransferState)> {
        let inner = self.lock();
        render::ordered(&inner.states)
            .into_iter()
            .map(|(id, s)| (id, s.clone()))
            .collect()
    }
}

impl ProgressSink for ProgressPanel {
    fn register(&self, id: TaskId, display_name: &str) {
        let mut inner = self.lock();
        inner.states.insert(id, TransferState::new(display_name));
        inner.update(false);
    }

    fn report(&self, id: TaskId, event: TransferEvent) {
        let mut inner = self.lock();
        let force = event.forces_redraw();
        match inner.states.get_mut(&id) {
            Some(state) => state.apply(event),
            None => {
                tracing::warn!(task = id, "progress report for unregistered task");
                return;
            }
        }
        inner.update(force);
    }
}

impl PanelInner {
    fn update(&mut self, force: bool) {
        let now = Instant::now();
        self.advance_scroll(now);
        if !force && self.throttled(now) {
            return;
        }
        if let Err(e) = self.redraw(now) {
            tracing::debug!(error = %e, "panel redraw failed");
        }
    }

    fn throttled(&self, now: Instant) -> bool {
        let recent = self
            .last_draw
            .is_some_and(|t| now.duration_since(t) < self.options.redraw_interval);
        let active = self
            .states
            .values()
            .any(|s| s.status == TransferStatus::Downloading);
        recent && active
    }

    fn advance_scroll(&mut self, now: Instant) {
        if now.duration_since(self.last_scroll) < self.options.scroll_interval {
            return;
        }
        self.last_scroll = now;
        for state in self.states.values_mut() {
            if render::scrolls(&state.display_name) && !state.status.is_terminal() {
                state.scroll_offset = render::next_scroll(&state.display_name, state.scroll_offset);
            }
        }
    }

    fn redraw(&mut self, now: Instant) -> io::Result<()> {
        let (cols, rows) = self.viewport.size();
        let rows_in_order = render::ordered(&self.states);
        let lines = render::panel_lines(&rows_in_order, cols, rows, self.options.margin);

        if self.prev_lines > 0 {
            let up = u16::try_from(self.prev_lines).unwrap_or(u16::MAX);
            queue!(self.out, MoveToPreviousLine(up))?;
        }
        if self.last_width.is_some_and(|w| w != cols) {
            queue!(self.out, Clear(ClearType::FromCursorDown))?;
        }
        for line in &lines {
            queue!(self.out, Clear(ClearType::CurrentLine), Print(line), Print("\n"))?;
        }
        if lines.len() < self.prev_lines {
            queue!(self.out, Clear(ClearType::FromCursorDown))?;
        }
        self.out.flush()?;

        self.prev_lines = lines.len();
        self.last_width = Some(cols);
        self.last_draw = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressSample;
    use std::sync::atomic::{AtomicU16, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn take(&self) -> String {
            let bytes = std::mem::take(&mut *self.0.lock().unwrap());
            String::from_utf8(bytes).unwrap()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[derive(Clone)]
    struct FixedViewport {
        cols: Arc<AtomicU16>,
        rows: Arc<AtomicU16>,
    }

    impl FixedViewport {
        fn new(cols: u16, rows: u16) -> Self {
            Self {
                cols: Arc::new(AtomicU16::new(cols)),
                rows: Arc::new(AtomicU16::new(rows)),
            }
        }

        fn set_cols(&self, cols: u16) {
            self.cols.store(cols, Ordering::SeqCst);
        }
    }

    impl Viewport for FixedViewport {
        fn size(&self) -> (u16, u16) {
            (self.cols.load(Ordering::SeqCst), self.rows.load(Ordering::SeqCst))
        }
    }

    fn panel(options: PanelOptions) -> (ProgressPanel, SharedBuf, FixedViewport) {
        let buf = SharedBuf::default();
        let vp = FixedViewport::new(100, 40);
        let p = ProgressPanel::new(Box::new(buf.clone()), Box::new(vp.clone()), options);
        (p, buf, vp)
    }

    fn progress(percent: f64) -> TransferEvent {
        TransferEvent::Progress(ProgressSample {
            percent: Some(percent),
            downloaded: percent as u64,
            rate: "  1.0 KB/s".to_string(),
            eta: "1s".to_string(),
        })
    }

    const CLEAR_BELOW: &str = "\u{1b}[J";
    const PREV_LINE_2: &str = "\u{1b}[2F";

    #[test]
    fn redraw_moves_up_by_previous_line_count() {
        let (p, buf, _) = panel(PanelOptions::default());
        p.register(1, "a.mp4");
        p.register(2, "b.mp4");
        let out = buf.take();
        assert!(out.contains("a.mp4"));
        assert!(out.contains("b.mp4"));

        p.finish();
        let out = buf.take();
        assert!(out.starts_with(PREV_LINE_2), "{out:?}");
        assert_eq!(out.matches('\n').count(), 2);
    }

    #[test]
    fn progress_is_throttled_but_completion_is_not() {
        let options = PanelOptions {
            redraw_interval: Duration::from_secs(60),
            ..PanelOptions::default()
        };
        let (p, buf, _) = panel(options);
        p.register(1, "a.mp4");
        p.report(1, progress(10.0));
        buf.take();

        p.report(1, progress(20.0));
        assert!(buf.take().is_empty(), "second sample within the interval is skipped");
        assert_eq!(p.snapshot(1).unwrap().percent, Some(20.0), "state still updated");

        p.report(1, TransferEvent::Completed { rate: "x".to_string() });
        assert!(buf.take().contains("100.0%"));
    }

    #[test]
    fn nothing_downloading_redraws_immediately() {
        let options = PanelOptions {
            redraw_interval: Duration::from_secs(60),
            ..PanelOptions::default()
        };
        let (p, buf, _) = panel(options);
        p.register(1, "a.mp4");
        buf.take();
        p.register(2, "b.mp4");
        assert!(!buf.take().is_empty());
    }

    #[test]
    fn width_change_clears_below() {
        let (p, buf, vp) = panel(PanelOptions::default());
        p.register(1, "a.mp4");
        p.finish();
        assert!(!buf.take().contains(CLEAR_BELOW));

        vp.set_cols(60);
        p.finish();
        let out = buf.take();
        assert!(out.contains(CLEAR_BELOW));
        // 60 columns leaves no room for a bar: compact line.
        assert!(!out.contains(" ["));
    }

    #[test]
    fn hidden_tasks_are_summarised() {
        let buf = SharedBuf::default();
        let vp = FixedViewport::new(100, 6);
        let p = ProgressPanel::new(Box::new(buf.clone()), Box::new(vp), PanelOptions::default());
        for id in 1..=5 {
            p.register(id, &format!("task{id}"));
        }
        p.finish();
        let out = buf.take();
        assert!(out.contains("... and 3 more"));
        assert!(out.contains("task1"));
        assert!(!out.contains("task5"));
    }

    #[test]
    fn downloading_rows_sort_first() {
        let (p, _, _) = panel(PanelOptions::default());
        p.register(1, "one");
        p.register(2, "two");
        p.register(3, "three");
        p.report(3, progress(5.0));
        p.report(1, TransferEvent::Skipped);
        let ids: Vec<TaskId> = p.states().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn long_names_scroll_on_tick() {
        let options = PanelOptions {
            scroll_interval: Duration::ZERO,
            ..PanelOptions::default()
        };
        let (p, _, _) = panel(options);
        p.register(1, "a-very-long-channel-name-for-scrolling.mp4");
        p.register(2, "short.mp4");
        let before = p.snapshot(1).unwrap().scroll_offset;
        p.tick();
        assert!(p.snapshot(1).unwrap().scroll_offset > before);
        assert_eq!(p.snapshot(2).unwrap().scroll_offset, 0);
    }

    #[test]
    fn unregistered_report_is_ignored() {
        let (p, buf, _) = panel(PanelOptions::default());
        p.report(9, progress(1.0));
        assert!(buf.take().is_empty());
        assert!(p.snapshot(9).is_none());
    }

    /// Records each flushed redraw as its own frame.
    #[derive(Clone, Default)]
    struct FrameLog {
        pending: Arc<Mutex<Vec<u8>>>,
        frames: Arc<Mutex<Vec<String>>>,
    }

    impl Write for FrameLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.pending.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            let bytes = std::mem::take(&mut *self.pending.lock().unwrap());
            self.frames.lock().unwrap().push(String::from_utf8(bytes).unwrap());
            Ok(())
        }
    }

    #[test]
    fn concurrent_reports_produce_whole_frames() {
        const WORKERS: usize = 4;
        const SAMPLES: usize = 200;

        let log = FrameLog::default();
        let options = PanelOptions {
            redraw_interval: Duration::ZERO,
            ..PanelOptions::default()
        };
        let p = Arc::new(ProgressPanel::new(
            Box::new(log.clone()),
            Box::new(FixedViewport::new(100, 40)),
            options,
        ));
        for id in 1..=WORKERS as TaskId {
            p.register(id, &format!("worker-{id}.mp4"));
        }
        let registration_frames = log.frames.lock().unwrap().len();

        let handles: Vec<_> = (1..=WORKERS as TaskId)
            .map(|id| {
                let p = Arc::clone(&p);
                std::thread::spawn(move || {
                    for i in 0..SAMPLES {
                        p.report(id, progress(i as f64 * 100.0 / SAMPLES as f64));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let frames = log.frames.lock().unwrap().clone();
        assert_eq!(frames.len(), registration_frames + WORKERS * SAMPLES);
        let mut prev_lines = 0;
        for (i, frame) in frames.iter().enumerate() {
            if prev_lines > 0 {
                let up = format!("\u{1b}[{prev_lines}F");
                assert!(frame.starts_with(&up), "frame {i}: {frame:?}");
                assert_eq!(frame.matches(&up).count(), 1, "frame {i}: {frame:?}");
            }
            let lines = frame.matches('\n').count();
            if i >= registration_frames {
                assert_eq!(lines, WORKERS, "frame {i}: {frame:?}");
            }
            prev_lines = lines;
        }
    }
}
