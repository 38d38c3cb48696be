use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use engine::{GameLogic, HeadlessRunner};
use serde::{Deserialize, Serialize};

use crate::board::{Board, COLS, LockOutcome, ROWS};
use crate::input::InputEvent;
use crate::piece::Piece;
use crate::session::{GameSession, SessionRules};

pub const DEFAULT_FRAME: Duration = Duration::from_millis(16);

/// One recorded frame: an optional input followed by a tick of `dt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayFrame {
    #[serde(rename = "dt_ms", with = "engine::serde_duration")]
    pub dt: Duration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<InputEvent>,
}

impl PlayFrame {
    pub fn idle(dt: Duration) -> Self {
        Self { dt, input: None }
    }

    pub fn with_input(dt: Duration, input: InputEvent) -> Self {
        Self {
            dt,
            input: Some(input),
        }
    }
}

/// Replayable game: the same seed, rules and frames always produce the same
/// session.
#[derive(Debug, Clone)]
pub struct TetrisLogic {
    seed: u64,
    rules: SessionRules,
}

impl TetrisLogic {
    pub fn new(seed: u64, rules: SessionRules) -> Self {
        Self { seed, rules }
    }
}

impl GameLogic for TetrisLogic {
    type State = GameSession;
    type Input = PlayFrame;

    fn initial_state(&self) -> Self::State {
        let mut session = GameSession::new(self.seed, self.rules);
        session.start();
        session.take_events();
        session
    }

    fn step(&self, state: &Self::State, input: Self::Input) -> Self::State {
        let mut next = state.clone();
        if let Some(event) = input.input {
            next.apply_input(event);
        }
        next.tick(input.dt);
        next
    }
}

/// Everything needed to reproduce a run frame by frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayLog {
    pub seed: u64,
    pub rules: SessionRules,
    pub frames: Vec<PlayFrame>,
}

impl ReplayLog {
    pub fn new(seed: u64, rules: SessionRules) -> Self {
        Self {
            seed,
            rules,
            frames: Vec::new(),
        }
    }

    pub fn push(&mut self, frame: PlayFrame) {
        self.frames.push(frame);
    }

    pub fn logic(&self) -> TetrisLogic {
        TetrisLogic::new(self.seed, self.rules)
    }

    /// Re-runs every frame, keeping at most `history` states for rewinding.
    pub fn replay(&self, history: usize) -> HeadlessRunner<TetrisLogic> {
        let mut runner = HeadlessRunner::with_history_limit(self.logic(), history);
        runner.run(self.frames.iter().copied());
        runner
    }

    pub fn save_json_file(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let text = serde_json::to_string(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, text)
    }

    pub fn load_json_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let bytes = fs::read(path)?;
        serde_json::from_slice(&bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub rotations: u8,
    pub col: i32,
    pub rating: i64,
}

/// Picks the resting spot for `piece` that leaves the flattest, hole-free
/// stack. Only rotations that fit in place are considered.
pub fn plan_placement(board: &Board, piece: &Piece) -> Option<Placement> {
    let mut best: Option<Placement> = None;
    let mut oriented = *piece;
    for rotations in 0..4u8 {
        for col in -3..COLS as i32 {
            let mut candidate = Piece { col, ..oriented };
            if board.collides(&candidate) {
                continue;
            }
            while !board.collides(&candidate.translated(0, 1)) {
                candidate = candidate.translated(0, 1);
            }
            let mut after = board.clone();
            if after.lock(&candidate) == LockOutcome::TopOut {
                continue;
            }
            let cleared = after.clear_lines();
            let rating = rate_board(&after, cleared);
            if best.is_none_or(|b| rating > b.rating) {
                best = Some(Placement {
                    rotations,
                    col,
                    rating,
                });
            }
        }
        oriented = oriented.rotated();
    }
    best
}

fn rate_board(board: &Board, cleared: usize) -> i64 {
    let heights: Vec<i64> = (0..COLS).map(|col| board.height_of(col) as i64).collect();
    let aggregate: i64 = heights.iter().sum();
    let bumpiness: i64 = heights.windows(2).map(|w| (w[0] - w[1]).abs()).sum();
    let holes = (0..COLS)
        .map(|col| {
            let top = ROWS - heights[col] as usize;
            (top..ROWS)
                .filter(|&row| board.cell(row, col) == Some(0))
                .count() as i64
        })
        .sum::<i64>();
    760 * cleared as i64 - 510 * aggregate - 360 * holes - 180 * bumpiness
}

/// Drives a session one input per frame: rotate, slide, then hard drop.
#[derive(Debug, Clone, Default)]
pub struct Autoplayer {
    target: Option<Target>,
}

#[derive(Debug, Clone, Copy)]
struct Target {
    piece_index: u64,
    rotations_left: u8,
    col: i32,
}

impl Autoplayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_input(&mut self, session: &GameSession) -> Option<InputEvent> {
        if !session.is_running() {
            return None;
        }
        let piece = *session.active().piece();
        let index = session.pieces_locked();
        if self.target.is_none_or(|t| t.piece_index != index) {
            self.target = plan_placement(session.board(), &piece).map(|p| Target {
                piece_index: index,
                rotations_left: p.rotations,
                col: p.col,
            });
        }
        let Some(target) = self.target.as_mut() else {
            return Some(InputEvent::HardDrop);
        };

        if target.rotations_left > 0 {
            target.rotations_left -= 1;
            return Some(InputEvent::Rotate);
        }
        Some(match piece.col.cmp(&target.col) {
            std::cmp::Ordering::Less if can_shift(session, 1) => InputEvent::MoveRight,
            std::cmp::Ordering::Greater if can_shift(session, -1) => InputEvent::MoveLeft,
            _ => InputEvent::HardDrop,
        })
    }
}

fn can_shift(session: &GameSession, dir: i32) -> bool {
    !session
        .board()
        .collides(&session.active().piece().translated(dir, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::PieceKind;

    #[test]
    fn planner_prefers_completing_a_line() {
        let mut board = Board::new();
        for col in 0..COLS {
            if col != 4 && col != 5 {
                board.set_cell(ROWS - 1, col, 8);
            }
        }
        let placement = plan_placement(&board, &Piece::spawn(PieceKind::O)).expect("fits");
        assert_eq!(placement.col, 4);
    }

    #[test]
    fn planner_finds_nothing_when_every_spot_tops_out() {
        let mut board = Board::new();
        for row in 0..ROWS {
            for col in 0..COLS {
                board.set_cell(row, col, 8);
            }
        }
        assert_eq!(plan_placement(&board, &Piece::spawn(PieceKind::T)), None);
    }

    #[test]
    fn autoplayer_ends_each_piece_with_hard_drop() {
        let mut session = GameSession::new(3, SessionRules::default());
        session.start();
        let mut player = Autoplayer::new();
        let mut drops = 0;
        for _ in 0..200 {
            let Some(input) = player.next_input(&session) else {
                break;
            };
            if input == InputEvent::HardDrop {
                drops += 1;
            }
            session.apply_input(input);
            session.tick(DEFAULT_FRAME);
        }
        assert!(drops >= 10, "only {drops} hard drops in 200 frames");
        assert_eq!(session.pieces_locked(), drops);
    }
}
