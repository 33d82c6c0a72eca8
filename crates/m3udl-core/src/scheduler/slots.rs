//! Worker-slot accounting with adaptive degradation.

/// Tracks in-flight workers against a concurrency limit that drops by one on
/// every failure (floor 1) and never grows back during the main pass.
///
/// The limit and the in-flight count change together in one `&mut self`
/// call, so two failures completing back to back cannot push the limit below
/// the floor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcurrencyLimiter {
    initial: usize,
    current: usize,
    in_flight: usize,
}

impl ConcurrencyLimiter {
    pub fn new(concurrency: usize) -> Self {
        let initial = concurrency.max(1);
        Self {
            initial,
            current: initial,
            in_flight: 0,
        }
    }

    pub fn initial(&self) -> usize {
        self.initial
    }

    /// Current limit.
    pub fn current(&self) -> usize {
        self.current
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn has_free_slot(&self) -> bool {
        self.in_flight < self.current
    }

    pub fn acquire(&mut self) {
        self.in_flight += 1;
    }

    pub fn release_success(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    /// Frees the slot and shrinks the limit by one.
    pub fn release_failure(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.current = self.current.saturating_sub(1).max(1);
    }

    /// An interrupted transfer says nothing about server health.
    pub fn release_cancelled(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }
}
