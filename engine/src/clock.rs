use std::time::{Duration, Instant};

/// Turns wall-clock instants into per-frame deltas for a tick-driven loop.
///
/// The first sample after construction or `reset()` yields `Duration::ZERO`,
/// so resuming from a pause never feeds the game one huge delta. Deltas are
/// also clamped to `max_delta` to survive stalls (debugger, suspended tab).
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    last: Option<Instant>,
    max_delta: Duration,
}

pub const DEFAULT_MAX_FRAME_DELTA: Duration = Duration::from_millis(250);

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_DELTA)
    }
}

impl FrameClock {
    pub fn new(max_delta: Duration) -> Self {
        Self {
            last: None,
            max_delta,
        }
    }

    pub fn max_delta(&self) -> Duration {
        self.max_delta
    }

    pub fn delta(&mut self, now: Instant) -> Duration {
        let dt = match self.last {
            Some(last) => now.saturating_duration_since(last),
            None => Duration::ZERO,
        };
        self.last = Some(now);
        dt.min(self.max_delta)
    }

    /// Forget the reference point; call when ticking resumes after a pause.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
