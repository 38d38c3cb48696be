//! Score, line, combo and level bookkeeping.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Base points for clearing 1..=4 rows at once, multiplied by the level.
pub const LINE_POINTS: [u32; 4] = [40, 100, 300, 1200];
pub const COMBO_BONUS_STEP: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LevelPolicy {
    /// One level per `every` of running time.
    ByTime {
        #[serde(rename = "every_ms", with = "engine::serde_duration")]
        every: Duration,
    },
    /// One level per `per_level` cleared rows.
    ByLines { per_level: u32 },
}

impl Default for LevelPolicy {
    fn default() -> Self {
        LevelPolicy::ByTime {
            every: Duration::from_secs(30),
        }
    }
}

impl LevelPolicy {
    /// Gravity curve used when none is configured explicitly.
    pub fn default_curve(&self) -> DropCurve {
        match self {
            LevelPolicy::ByTime { .. } => DropCurve {
                base_ms: 500,
                step_ms: 40,
                min_ms: 50,
            },
            LevelPolicy::ByLines { .. } => DropCurve {
                base_ms: 500,
                step_ms: 100,
                min_ms: 100,
            },
        }
    }

    fn target_level(&self, elapsed: Duration, lines: u32) -> u32 {
        let steps = match *self {
            LevelPolicy::ByTime { every } if !every.is_zero() => {
                (elapsed.as_millis() / every.as_millis()).min(u32::MAX as u128 - 1) as u32
            }
            LevelPolicy::ByLines { per_level } if per_level > 0 => lines / per_level,
            _ => 0,
        };
        steps.saturating_add(1)
    }
}

/// `interval = max(min, base - step * (level - 1))`, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropCurve {
    pub base_ms: u64,
    pub step_ms: u64,
    pub min_ms: u64,
}

impl DropCurve {
    pub fn interval(&self, level: u32) -> Duration {
        let decrease = self.step_ms.saturating_mul(u64::from(level.saturating_sub(1)));
        Duration::from_millis(self.base_ms.saturating_sub(decrease).max(self.min_ms))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionRules {
    pub level_policy: LevelPolicy,
    /// Overrides the policy's default gravity curve.
    pub drop_curve: Option<DropCurve>,
}

impl ProgressionRules {
    pub fn curve(&self) -> DropCurve {
        self.drop_curve
            .unwrap_or_else(|| self.level_policy.default_curve())
    }
}

pub fn line_clear_points(lines: usize, level: u32) -> u32 {
    if lines == 0 {
        return 0;
    }
    let base = LINE_POINTS[lines.min(LINE_POINTS.len()) - 1];
    base.saturating_mul(level)
}

pub fn combo_bonus(combo: u32, level: u32) -> u32 {
    combo
        .saturating_sub(1)
        .saturating_mul(COMBO_BONUS_STEP)
        .saturating_mul(level)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineClearReport {
    pub lines: u32,
    pub points: u32,
    pub combo: u32,
    pub combo_bonus: u32,
    /// Level the clear was scored at.
    pub level: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Progress {
    score: u32,
    lines: u32,
    level: u32,
    combo: u32,
    rules: ProgressionRules,
}

impl Progress {
    pub fn new(rules: ProgressionRules) -> Self {
        Self {
            score: 0,
            lines: 0,
            level: 1,
            combo: 0,
            rules,
        }
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn lines(&self) -> u32 {
        self.lines
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn rules(&self) -> ProgressionRules {
        self.rules
    }

    pub fn drop_interval(&self) -> Duration {
        self.rules.curve().interval(self.level)
    }

    /// Scores one lock that removed `cleared` rows. A lock without clears
    /// breaks the combo chain.
    pub fn record_lock(&mut self, cleared: usize) -> Option<LineClearReport> {
        if cleared == 0 {
            self.combo = 0;
            return None;
        }
        self.combo = self.combo.saturating_add(1);
        let points = line_clear_points(cleared, self.level);
        let bonus = combo_bonus(self.combo, self.level);
        self.score = self.score.saturating_add(points).saturating_add(bonus);
        self.lines = self.lines.saturating_add(cleared as u32);
        Some(LineClearReport {
            lines: cleared as u32,
            points,
            combo: self.combo,
            combo_bonus: bonus,
            level: self.level,
        })
    }

    /// Raises the level if the policy allows it. Returns the new level when
    /// it changed; the level never goes down.
    pub fn update_level(&mut self, elapsed: Duration) -> Option<u32> {
        let target = self.rules.level_policy.target_level(elapsed, self.lines);
        if target > self.level {
            self.level = target;
            Some(target)
        } else {
            None
        }
    }

    pub fn reset(&mut self) {
        *self = Progress::new(self.rules);
    }
}
