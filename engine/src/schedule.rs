//! Scheduled events evaluated by a tick driver.
//!
//! Everything here is plain data keyed on a caller-supplied game clock
//! (`Duration` since session start). Nothing runs on its own: a paused game
//! simply stops polling, and a restarted game builds fresh values, so there
//! is never a timer left pointing at a stale session.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Fires once whenever strictly more than `interval` has passed since the
/// last firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Periodic {
    #[serde(with = "crate::serde_duration")]
    interval: Duration,
    #[serde(with = "crate::serde_duration")]
    last: Duration,
}

impl Periodic {
    pub fn starting_at(interval: Duration, now: Duration) -> Self {
        Self {
            interval,
            last: now,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Interval changes apply to the pending firing, measured from the last one.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn last_fired(&self) -> Duration {
        self.last
    }

    pub fn next_due(&self) -> Duration {
        self.last.saturating_add(self.interval)
    }

    pub fn is_due(&self, now: Duration) -> bool {
        now.saturating_sub(self.last) > self.interval
    }

    pub fn poll(&mut self, now: Duration) -> bool {
        if !self.is_due(now) {
            return false;
        }
        self.last = now;
        true
    }

    pub fn restart(&mut self, now: Duration) {
        self.last = now;
    }
}

/// Half-open span of game time `[opens_at, closes_at)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    #[serde(with = "crate::serde_duration")]
    opens_at: Duration,
    #[serde(with = "crate::serde_duration")]
    closes_at: Duration,
}

impl Window {
    pub fn new(opens_at: Duration, length: Duration) -> Self {
        Self {
            opens_at,
            closes_at: opens_at.saturating_add(length),
        }
    }

    pub fn opens_at(&self) -> Duration {
        self.opens_at
    }

    pub fn closes_at(&self) -> Duration {
        self.closes_at
    }

    pub fn contains(&self, now: Duration) -> bool {
        now >= self.opens_at && now < self.closes_at
    }

    pub fn has_closed(&self, now: Duration) -> bool {
        now >= self.closes_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn periodic_fires_only_after_strictly_exceeding_interval() {
        let mut p = Periodic::starting_at(ms(100), ms(0));
        assert!(!p.poll(ms(100)));
        assert!(p.poll(ms(101)));
        assert_eq!(p.last_fired(), ms(101));
        assert!(!p.poll(ms(150)));
        assert_eq!(p.next_due(), ms(201));
    }

    #[test]
    fn shrinking_interval_applies_from_last_firing() {
        let mut p = Periodic::starting_at(ms(1_000), ms(0));
        assert!(!p.is_due(ms(600)));
        p.set_interval(ms(500));
        assert!(p.poll(ms(600)));
    }

    #[test]
    fn window_is_half_open() {
        let w = Window::new(ms(10), ms(5));
        assert!(!w.contains(ms(9)));
        assert!(w.contains(ms(10)));
        assert!(w.contains(ms(14)));
        assert!(!w.contains(ms(15)));
        assert!(w.has_closed(ms(15)));
    }

    #[test]
    fn schedule_values_round_trip_as_millis() {
        let p = Periodic::starting_at(ms(250), ms(1_000));
        let json = serde_json::to_string(&p).expect("serialize periodic");
        assert_eq!(json, r#"{"interval":250,"last":1000}"#);
        let back: Periodic = serde_json::from_str(&json).expect("deserialize periodic");
        assert_eq!(back, p);
    }
}
