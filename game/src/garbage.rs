//! Adversarial board degradation: periodic garbage rows pushed in from the
//! bottom, and obstacle storms that rain single obstruction cells.
//!
//! Both run off `engine::schedule` values stored in the session, so nothing
//! fires while the session is paused, over, or after a restart.

use std::time::Duration;

use engine::schedule::{Periodic, Window};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::board::{COLS, Row};
use crate::piece::{CELL_EMPTY, CELL_OBSTRUCTION};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GarbageRules {
    pub enabled: bool,
    pub min_level: u32,
    #[serde(rename = "base_interval_ms", with = "engine::serde_duration")]
    pub base_interval: Duration,
    /// Subtracted from the interval once per level above `min_level`.
    #[serde(rename = "interval_step_ms", with = "engine::serde_duration")]
    pub interval_step: Duration,
    #[serde(rename = "min_interval_ms", with = "engine::serde_duration")]
    pub min_interval: Duration,
    /// Level from which two rows arrive per injection.
    pub double_rows_level: u32,
}

impl Default for GarbageRules {
    fn default() -> Self {
        Self {
            enabled: true,
            min_level: 2,
            base_interval: Duration::from_secs(12),
            interval_step: Duration::from_millis(500),
            min_interval: Duration::from_secs(5),
            double_rows_level: 10,
        }
    }
}

impl GarbageRules {
    pub fn interval_for(&self, level: u32) -> Duration {
        let steps = level.saturating_sub(self.min_level);
        self.base_interval
            .saturating_sub(self.interval_step.saturating_mul(steps))
            .max(self.min_interval)
    }

    pub fn rows_for(&self, level: u32) -> usize {
        if level >= self.double_rows_level { 2 } else { 1 }
    }

    pub fn sanitized(mut self) -> Self {
        self.min_level = self.min_level.max(1);
        self.min_interval = self.min_interval.max(Duration::from_millis(100));
        self.base_interval = self.base_interval.max(self.min_interval);
        self
    }
}

/// Holes per garbage row: grows by one every 1.6 levels above 2, between 1
/// and `COLS / 2`.
pub fn empty_cells_for(level: u32) -> usize {
    let grown = 1 + (level.saturating_sub(2) as usize * 5) / 8;
    grown.clamp(1, COLS / 2)
}

/// A row of obstruction cells with `empty_cells_for(level)` holes at distinct
/// random columns.
pub fn garbage_row(level: u32, rng: &mut impl Rng) -> Row {
    let mut row = [CELL_OBSTRUCTION; COLS];
    for col in rand::seq::index::sample(rng, COLS, empty_cells_for(level)) {
        row[col] = CELL_EMPTY;
    }
    row
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StormRules {
    pub enabled: bool,
    pub min_level: u32,
    /// Gap between the end of one storm and the start of the next.
    #[serde(rename = "every_ms", with = "engine::serde_duration")]
    pub every: Duration,
    #[serde(rename = "duration_ms", with = "engine::serde_duration")]
    pub duration: Duration,
    #[serde(rename = "drop_every_ms", with = "engine::serde_duration")]
    pub drop_every: Duration,
}

impl Default for StormRules {
    fn default() -> Self {
        Self {
            enabled: true,
            min_level: 4,
            every: Duration::from_secs(45),
            duration: Duration::from_secs(6),
            drop_every: Duration::from_millis(700),
        }
    }
}

impl StormRules {
    pub fn sanitized(mut self) -> Self {
        self.min_level = self.min_level.max(1);
        self.drop_every = self.drop_every.max(Duration::from_millis(50));
        self.every = self.every.max(Duration::from_secs(1));
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InjectorTick {
    /// Garbage rows to push in from the bottom, in order.
    pub rows: Vec<Row>,
    /// Columns that each receive one falling obstruction cell.
    pub drops: Vec<usize>,
    pub storm_started: bool,
    pub storm_ended: bool,
}

impl InjectorTick {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.drops.is_empty() && !self.storm_started && !self.storm_ended
    }
}

#[derive(Debug, Clone)]
struct Storm {
    window: Window,
    drops: Periodic,
}

#[derive(Debug, Clone)]
pub struct GarbageInjector {
    garbage: GarbageRules,
    storm_rules: StormRules,
    rng: StdRng,
    garbage_timer: Periodic,
    next_storm_at: Option<Duration>,
    storm: Option<Storm>,
}

impl GarbageInjector {
    /// `now` is the game time the garbage interval is measured from.
    pub fn new(garbage: GarbageRules, storm_rules: StormRules, seed: u64, now: Duration) -> Self {
        Self {
            garbage,
            storm_rules,
            rng: StdRng::seed_from_u64(seed),
            garbage_timer: Periodic::starting_at(garbage.interval_for(garbage.min_level), now),
            next_storm_at: None,
            storm: None,
        }
    }

    pub fn garbage_rules(&self) -> GarbageRules {
        self.garbage
    }

    pub fn storm_rules(&self) -> StormRules {
        self.storm_rules
    }

    pub fn storm_active(&self) -> bool {
        self.storm.is_some()
    }

    pub fn next_storm_at(&self) -> Option<Duration> {
        self.next_storm_at
    }

    /// Game time of the last garbage injection (or of the start).
    pub fn last_garbage_at(&self) -> Duration {
        self.garbage_timer.last_fired()
    }

    /// Cancels any running storm and restarts every schedule from `now`.
    pub fn restart(&mut self, now: Duration) {
        self.garbage_timer.restart(now);
        self.next_storm_at = None;
        self.storm = None;
    }

    /// Evaluates every schedule at game time `now` for the current level.
    pub fn poll(&mut self, level: u32, now: Duration) -> InjectorTick {
        let mut tick = InjectorTick::default();
        self.poll_garbage(level, now, &mut tick);
        self.poll_storm(level, now, &mut tick);
        tick
    }

    fn poll_garbage(&mut self, level: u32, now: Duration, tick: &mut InjectorTick) {
        if !self.garbage.enabled || level < self.garbage.min_level {
            return;
        }
        self.garbage_timer
            .set_interval(self.garbage.interval_for(level));
        if self.garbage_timer.poll(now) {
            let count = self.garbage.rows_for(level);
            tick.rows = (0..count)
                .map(|_| garbage_row(level, &mut self.rng))
                .collect();
        }
    }

    fn poll_storm(&mut self, level: u32, now: Duration, tick: &mut InjectorTick) {
        if !self.storm_rules.enabled {
            return;
        }

        if let Some(storm) = &mut self.storm {
            if storm.window.has_closed(now) {
                self.storm = None;
                self.next_storm_at = Some(now + self.storm_rules.every);
                tick.storm_ended = true;
            } else if storm.drops.poll(now) {
                tick.drops.push(self.rng.gen_range(0..COLS));
            }
            return;
        }

        if level < self.storm_rules.min_level {
            return;
        }
        let opens_at = *self
            .next_storm_at
            .get_or_insert(now + self.storm_rules.every);
        if now >= opens_at {
            self.storm = Some(Storm {
                window: Window::new(now, self.storm_rules.duration),
                drops: Periodic::starting_at(self.storm_rules.drop_every, now),
            });
            tick.storm_started = true;
        }
    }
}
