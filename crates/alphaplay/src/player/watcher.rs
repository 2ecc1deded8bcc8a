use std::time::{Duration, Instant};

/// Sampling period of the position watcher.
pub const WATCH_PERIOD: Duration = Duration::from_millis(100);

/// One-shot, re-armable deadline driving position sampling.
///
/// The watcher owns no thread: the player polls it from its update pump, and
/// at most one firing is ever pending. Disarming removes that firing.
#[derive(Debug, Clone)]
pub struct PositionWatcher {
    period: Duration,
    deadline: Option<Instant>,
}

impl Default for PositionWatcher {
    fn default() -> Self {
        Self::new(WATCH_PERIOD)
    }
}

impl PositionWatcher {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            deadline: None,
        }
    }

    /// Schedule the next firing one period after `now`, replacing any
    /// pending one.
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.period);
    }

    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Consume the pending firing if it is due at `now`.
    pub fn poll_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
