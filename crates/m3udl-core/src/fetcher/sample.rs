//! Throttled progress samples for one transfer attempt.

use std::time::{Duration, Instant};

use crate::format::{eta_for, format_rate, ETA_UNKNOWN};
use crate::progress::ProgressSample;

/// Tracks bytes for one attempt and decides when a sample is due.
///
/// Samples are emitted at most once per `interval`, and always on the chunk
/// that completes a transfer of known size. Percent never decreases.
#[derive(Debug)]
pub struct ProgressSampler {
    total: u64,
    downloaded: u64,
    session_bytes: u64,
    session_start: Instant,
    last_emit: Option<Instant>,
    interval: Duration,
    last_percent: f64,
}

impl ProgressSampler {
    /// `offset` is the resumed prefix already on disk.
    pub fn new(total: u64, offset: u64, interval: Duration) -> Self {
        Self {
            total,
            downloaded: offset,
            session_bytes: 0,
            session_start: Instant::now(),
            last_emit: None,
            interval,
            last_percent: 0.0,
        }
    }

    /// Forget the resumed prefix; the server is sending the whole body.
    pub fn restart(&mut self) {
        self.downloaded = 0;
        self.session_bytes = 0;
        self.session_start = Instant::now();
        self.last_percent = 0.0;
    }

    /// Accounts for `n` new bytes and returns a sample if one is due.
    pub fn record(&mut self, n: u64) -> Option<ProgressSample> {
        self.downloaded += n;
        self.session_bytes += n;
        let now = Instant::now();
        let complete = self.total > 0 && self.downloaded >= self.total;
        let due = match self.last_emit {
            None => true,
            Some(last) => now.duration_since(last) >= self.interval,
        };
        if !(due || complete) {
            return None;
        }
        self.last_emit = Some(now);
        Some(self.sample())
    }

    fn sample(&mut self) -> ProgressSample {
        let rate = self.rate();
        let percent = if self.total > 0 {
            let p = (self.downloaded as f64 / self.total as f64 * 100.0).min(100.0);
            self.last_percent = self.last_percent.max(p);
            Some(self.last_percent)
        } else {
            None
        };
        let eta = if self.total > 0 {
            eta_for(self.total.saturating_sub(self.downloaded), rate)
        } else {
            ETA_UNKNOWN.to_string()
        };
        ProgressSample {
            percent,
            downloaded: self.downloaded,
            rate: format_rate(rate),
            eta,
        }
    }

    /// Bytes per second received in this attempt.
    pub fn rate(&self) -> f64 {
        let secs = self.session_start.elapsed().as_secs_f64();
        if secs > 0.0 {
            self.session_bytes as f64 / secs
        } else {
            0.0
        }
    }

    pub fn downloaded(&self) -> u64 {
        self.downloaded
    }

    pub fn session_bytes(&self) -> u64 {
        self.session_bytes
    }

    pub fn elapsed(&self) -> Duration {
        self.session_start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_chunk_always_emits_then_throttles() {
        let mut s = ProgressSampler::new(1000, 0, Duration::from_secs(60));
        assert!(s.record(10).is_some());
        assert!(s.record(10).is_none());
        assert!(s.record(10).is_none());
        assert_eq!(s.downloaded(), 30);
    }

    #[test]
    fn completing_chunk_always_emits() {
        let mut s = ProgressSampler::new(100, 0, Duration::from_secs(60));
        assert!(s.record(50).is_some());
        let last = s.record(50).expect("completion sample");
        assert_eq!(last.percent, Some(100.0));
        assert_eq!(last.downloaded, 100);
    }

    #[test]
    fn resumed_prefix_counts_toward_percent_not_session() {
        let mut s = ProgressSampler::new(1000, 400, Duration::ZERO);
        let sample = s.record(100).unwrap();
        assert_eq!(sample.percent, Some(50.0));
        assert_eq!(s.session_bytes(), 100);
        assert_eq!(s.downloaded(), 500);
    }

    #[test]
    fn unknown_total_has_no_percent() {
        let mut s = ProgressSampler::new(0, 0, Duration::ZERO);
        let sample = s.record(4096).unwrap();
        assert_eq!(sample.percent, None);
        assert_eq!(sample.eta, ETA_UNKNOWN);
        assert_eq!(sample.downloaded, 4096);
    }

    #[test]
    fn percent_is_non_decreasing_and_capped() {
        let mut s = ProgressSampler::new(100, 0, Duration::ZERO);
        let mut last = 0.0;
        for _ in 0..15 {
            if let Some(p) = s.record(10).and_then(|x| x.percent) {
                assert!(p >= last);
                assert!(p <= 100.0);
                last = p;
            }
        }
        assert_eq!(last, 100.0);
    }

    #[test]
    fn restart_resets_counters() {
        let mut s = ProgressSampler::new(100, 40, Duration::ZERO);
        s.restart();
        let sample = s.record(10).unwrap();
        assert_eq!(sample.percent, Some(10.0));
        assert_eq!(s.session_bytes(), 10);
    }
}
