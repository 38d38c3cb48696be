use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::piece::Piece;

pub const LOCK_DELAY_DEFAULT: Duration = Duration::from_millis(500);
pub const MAX_LOCK_MOVES_DEFAULT: u32 = 15;

/// `(d_col, d_row)` offsets tried in order when a rotation collides in place.
/// Negative rows move the piece up.
pub const KICK_OFFSETS: [(i32, i32); 7] = [(1, 0), (-1, 0), (0, -1), (1, -1), (-1, -1), (2, 0), (-2, 0)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockRules {
    #[serde(rename = "lock_delay_ms", with = "engine::serde_duration")]
    pub delay: Duration,
    pub max_moves: u32,
}

impl Default for LockRules {
    fn default() -> Self {
        Self {
            delay: LOCK_DELAY_DEFAULT,
            max_moves: MAX_LOCK_MOVES_DEFAULT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockPhase {
    Falling,
    /// Resting on the stack; `since` is game time when the delay (re)started.
    LockPending { since: Duration, moves: u32 },
    Locked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDown {
    Moved,
    Grounded,
}

/// The falling piece plus its lock-delay bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivePiece {
    piece: Piece,
    phase: LockPhase,
    rules: LockRules,
    last_kick: Option<(i32, i32)>,
}

impl ActivePiece {
    pub fn new(piece: Piece, rules: LockRules) -> Self {
        Self {
            piece,
            phase: LockPhase::Falling,
            rules,
            last_kick: None,
        }
    }

    pub fn piece(&self) -> &Piece {
        &self.piece
    }

    pub fn phase(&self) -> LockPhase {
        self.phase
    }

    pub fn rules(&self) -> LockRules {
        self.rules
    }

    pub fn is_lock_pending(&self) -> bool {
        matches!(self.phase, LockPhase::LockPending { .. })
    }

    pub fn lock_moves(&self) -> u32 {
        match self.phase {
            LockPhase::LockPending { moves, .. } => moves,
            _ => 0,
        }
    }

    /// Kick applied by the last successful rotation (`(0, 0)` when none was needed).
    pub fn last_kick(&self) -> Option<(i32, i32)> {
        self.last_kick
    }

    pub fn is_grounded(&self, board: &Board) -> bool {
        board.collides(&self.piece.translated(0, 1))
    }

    pub fn shift(&mut self, dir: i32, board: &Board, now: Duration) -> bool {
        if self.phase == LockPhase::Locked {
            return false;
        }
        let moved = self.piece.translated(dir.signum(), 0);
        if board.collides(&moved) {
            return false;
        }
        self.piece = moved;
        self.reevaluate_rest(board, now);
        true
    }

    pub fn rotate(&mut self, board: &Board, now: Duration) -> bool {
        if self.phase == LockPhase::Locked {
            return false;
        }
        let rotated = self.piece.rotated();
        let kick = if !board.collides(&rotated) {
            Some((0, 0))
        } else {
            KICK_OFFSETS
                .iter()
                .copied()
                .find(|&(d_col, d_row)| !board.collides(&rotated.translated(d_col, d_row)))
        };

        let Some((d_col, d_row)) = kick else {
            return false;
        };
        self.piece = rotated.translated(d_col, d_row);
        self.last_kick = Some((d_col, d_row));
        self.reevaluate_rest(board, now);
        true
    }

    /// One row of gravity or soft drop. A blocked step arms the lock delay
    /// instead of moving.
    pub fn step_down(&mut self, board: &Board, now: Duration) -> StepDown {
        let lowered = self.piece.translated(0, 1);
        if board.collides(&lowered) {
            if self.phase == LockPhase::Falling {
                self.phase = LockPhase::LockPending {
                    since: now,
                    moves: 0,
                };
            }
            return StepDown::Grounded;
        }
        self.piece = lowered;
        if self.phase != LockPhase::Locked {
            self.phase = LockPhase::Falling;
        }
        StepDown::Moved
    }

    /// Drops straight down and marks the piece for immediate locking.
    /// Returns the number of rows travelled.
    pub fn hard_drop(&mut self, board: &Board) -> u32 {
        let mut distance = 0;
        while !board.collides(&self.piece.translated(0, 1)) {
            self.piece = self.piece.translated(0, 1);
            distance += 1;
        }
        self.phase = LockPhase::Locked;
        distance
    }

    pub fn lock_due(&self, now: Duration) -> bool {
        match self.phase {
            LockPhase::LockPending { since, moves } => {
                now.saturating_sub(since) > self.rules.delay || moves >= self.rules.max_moves
            }
            LockPhase::Locked => true,
            LockPhase::Falling => false,
        }
    }

    pub fn mark_locked(&mut self) {
        self.phase = LockPhase::Locked;
    }

    /// Landing position of a hard drop, without moving.
    pub fn ghost(&self, board: &Board) -> Piece {
        let mut ghost = self.piece;
        if board.collides(&ghost) {
            return ghost;
        }
        while !board.collides(&ghost.translated(0, 1)) {
            ghost = ghost.translated(0, 1);
        }
        ghost
    }

    /// Moves the piece up by `rows` after the stack was pushed up beneath it.
    /// Returns false when the raised piece still overlaps the stack.
    pub fn raise(&mut self, rows: usize, board: &Board) -> bool {
        self.piece = self.piece.translated(0, -(rows as i32));
        if board.collides(&self.piece) {
            return false;
        }
        if self.is_lock_pending() && !self.is_grounded(board) {
            self.phase = LockPhase::Falling;
        }
        true
    }

    fn reevaluate_rest(&mut self, board: &Board, now: Duration) {
        if !self.is_grounded(board) {
            self.phase = LockPhase::Falling;
            return;
        }
        self.phase = match self.phase {
            LockPhase::LockPending { since, moves } => {
                let moves = moves.saturating_add(1);
                let since = if moves < self.rules.max_moves { now } else { since };
                LockPhase::LockPending { since, moves }
            }
            _ => LockPhase::LockPending {
                since: now,
                moves: 0,
            },
        };
    }
}
