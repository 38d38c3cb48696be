//! Game loop driver.
//!
//! `GameSession` owns every piece of mutable game state and is advanced by
//! `tick(dt)` with the time elapsed since the previous tick. Inputs are either
//! applied immediately (`apply_input`) or queued and applied at the start of
//! the next tick (`queue_input`). Observable changes are reported as
//! `GameEvent`s returned from `tick` and `take_events`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bag::PieceGenerator;
use crate::board::{Board, LockOutcome, ObstructionDrop, Row};
use crate::controller::{ActivePiece, LockRules};
use crate::garbage::{GarbageInjector, GarbageRules, StormRules};
use crate::input::{InputEvent, InputQueue};
use crate::piece::{Piece, PieceKind};
use crate::scoring::{LineClearReport, Progress, ProgressionRules};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionRules {
    pub lock: LockRules,
    pub progression: ProgressionRules,
    pub garbage: GarbageRules,
    pub storm: StormRules,
}

impl SessionRules {
    pub fn sanitized(mut self) -> Self {
        self.lock.max_moves = self.lock.max_moves.max(1);
        self.garbage = self.garbage.sanitized();
        self.storm = self.storm.sanitized();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Ready,
    Running,
    Paused,
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverCause {
    /// A piece locked with cells above the visible board.
    TopOut,
    /// The next piece overlapped the stack at its spawn position.
    SpawnBlocked,
    GarbageOverflow,
    StormOverflow,
}

/// Submitted to the score service once the game ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalScore {
    pub score: u32,
    pub lines: u32,
    pub level: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    Started { session_id: u64 },
    Paused,
    Resumed,
    PieceLocked { kind: PieceKind },
    LinesCleared(LineClearReport),
    LevelUp { level: u32 },
    GarbageInjected { rows: usize },
    StormStarted,
    StormEnded,
    ObstructionDropped { col: usize, row: usize },
    GameOver { cause: GameOverCause, score: FinalScore },
}

#[derive(Debug, Clone)]
pub struct GameSession {
    rules: SessionRules,
    seed: u64,
    session_id: u64,
    status: SessionStatus,
    board: Board,
    generator: PieceGenerator,
    injector: GarbageInjector,
    active: ActivePiece,
    next: Piece,
    progress: Progress,
    pieces_locked: u64,
    elapsed: Duration,
    since_gravity: Duration,
    inputs: InputQueue,
    events: Vec<GameEvent>,
    game_over: Option<GameOverCause>,
}

impl GameSession {
    pub fn new(seed: u64, rules: SessionRules) -> Self {
        let rules = rules.sanitized();
        let mut generator = PieceGenerator::new(run_seed(seed, 0));
        let active = ActivePiece::new(generator.next_piece(), rules.lock);
        let next = generator.next_piece();
        Self {
            rules,
            seed,
            session_id: 0,
            status: SessionStatus::Ready,
            board: Board::new(),
            generator,
            injector: GarbageInjector::new(
                rules.garbage,
                rules.storm,
                injector_seed(seed, 0),
                Duration::ZERO,
            ),
            active,
            next,
            progress: Progress::new(rules.progression),
            pieces_locked: 0,
            elapsed: Duration::ZERO,
            since_gravity: Duration::ZERO,
            inputs: InputQueue::default(),
            events: Vec::new(),
            game_over: None,
        }
    }

    pub fn rules(&self) -> &SessionRules {
        &self.rules
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Bumped on every `start`; 0 before the first one.
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == SessionStatus::Running
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn active(&self) -> &ActivePiece {
        &self.active
    }

    pub fn next_piece(&self) -> &Piece {
        &self.next
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    /// Pieces placed on the board since `start`.
    pub fn pieces_locked(&self) -> u64 {
        self.pieces_locked
    }

    pub fn injector(&self) -> &GarbageInjector {
        &self.injector
    }

    /// Game time since `start`, excluding paused spans.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn game_over_cause(&self) -> Option<GameOverCause> {
        self.game_over
    }

    pub fn final_score(&self) -> FinalScore {
        FinalScore {
            score: self.progress.score(),
            lines: self.progress.lines(),
            level: self.progress.level(),
        }
    }

    pub fn ghost(&self) -> Piece {
        self.active.ghost(&self.board)
    }

    /// Resets every piece of state and begins a new run.
    pub fn start(&mut self) {
        self.session_id += 1;
        self.board.clear();
        self.generator = PieceGenerator::new(run_seed(self.seed, self.session_id));
        self.active = ActivePiece::new(self.generator.next_piece(), self.rules.lock);
        self.next = self.generator.next_piece();
        self.progress.reset();
        self.pieces_locked = 0;
        self.injector = GarbageInjector::new(
            self.rules.garbage,
            self.rules.storm,
            injector_seed(self.seed, self.session_id),
            Duration::ZERO,
        );
        self.elapsed = Duration::ZERO;
        self.since_gravity = Duration::ZERO;
        self.inputs.clear();
        self.game_over = None;
        self.status = SessionStatus::Running;
        self.events.push(GameEvent::Started {
            session_id: self.session_id,
        });
    }

    /// Running -> Paused -> Running. Resuming restarts the gravity reference
    /// so the pause does not count towards the next drop.
    pub fn toggle_pause(&mut self) -> bool {
        match self.status {
            SessionStatus::Running => {
                self.status = SessionStatus::Paused;
                self.events.push(GameEvent::Paused);
                true
            }
            SessionStatus::Paused => {
                self.status = SessionStatus::Running;
                self.since_gravity = Duration::ZERO;
                self.events.push(GameEvent::Resumed);
                true
            }
            SessionStatus::Ready | SessionStatus::GameOver => false,
        }
    }

    pub fn queue_input(&mut self, event: InputEvent) {
        if !self.inputs.push(event) {
            eprintln!("[session] input queue full, dropped oldest input");
        }
    }

    /// Applies one input right away. Returns whether it changed anything.
    pub fn apply_input(&mut self, event: InputEvent) -> bool {
        match event {
            InputEvent::Start => {
                self.start();
                return true;
            }
            InputEvent::Pause => return self.toggle_pause(),
            _ => {}
        }
        if !self.is_running() {
            return false;
        }

        let now = self.elapsed;
        match event {
            InputEvent::MoveLeft => self.active.shift(-1, &self.board, now),
            InputEvent::MoveRight => self.active.shift(1, &self.board, now),
            InputEvent::Rotate => self.active.rotate(&self.board, now),
            InputEvent::SoftDrop => {
                self.active.step_down(&self.board, now);
                self.since_gravity = Duration::ZERO;
                true
            }
            InputEvent::HardDrop => {
                self.active.hard_drop(&self.board);
                self.lock_active();
                true
            }
            InputEvent::Start | InputEvent::Pause => false,
        }
    }

    /// Advances game time by `dt` and runs one frame: queued inputs, level,
    /// lock delay or gravity, then garbage and storms. Returns the events
    /// produced since the last drain.
    pub fn tick(&mut self, dt: Duration) -> Vec<GameEvent> {
        let queued: Vec<InputEvent> = self.inputs.drain().collect();
        for event in queued {
            self.apply_input(event);
        }

        if self.is_running() {
            self.advance(dt);
        }
        self.take_events()
    }

    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    fn advance(&mut self, dt: Duration) {
        self.elapsed += dt;
        self.since_gravity += dt;
        self.check_level();

        if self.active.lock_due(self.elapsed) {
            self.lock_active();
        } else if !self.active.is_lock_pending() && self.since_gravity > self.progress.drop_interval() {
            self.since_gravity = Duration::ZERO;
            self.active.step_down(&self.board, self.elapsed);
        }

        if self.is_running() {
            self.run_injector();
        }
    }

    fn check_level(&mut self) {
        if let Some(level) = self.progress.update_level(self.elapsed) {
            self.events.push(GameEvent::LevelUp { level });
        }
    }

    fn lock_active(&mut self) {
        self.active.mark_locked();
        let piece = *self.active.piece();
        if self.board.lock(&piece) == LockOutcome::TopOut {
            self.end(GameOverCause::TopOut);
            return;
        }
        self.pieces_locked += 1;
        self.events.push(GameEvent::PieceLocked { kind: piece.kind });

        let cleared = self.board.clear_lines();
        if let Some(report) = self.progress.record_lock(cleared) {
            self.events.push(GameEvent::LinesCleared(report));
            self.check_level();
        }
        self.spawn_next();
    }

    fn spawn_next(&mut self) {
        let piece = std::mem::replace(&mut self.next, self.generator.next_piece());
        self.active = ActivePiece::new(piece, self.rules.lock);
        if self.board.collides(&piece) {
            self.end(GameOverCause::SpawnBlocked);
        }
    }

    fn run_injector(&mut self) {
        let tick = self.injector.poll(self.progress.level(), self.elapsed);
        if tick.storm_started {
            self.events.push(GameEvent::StormStarted);
        }
        if !tick.rows.is_empty() && !self.inject_garbage(&tick.rows) {
            return;
        }
        for col in tick.drops {
            let blocked: Vec<(i32, i32)> = self.active.piece().cells().collect();
            match self.board.drop_obstruction(col, &blocked) {
                ObstructionDrop::Landed { row } => {
                    self.events.push(GameEvent::ObstructionDropped { col, row });
                }
                ObstructionDrop::Skipped => {}
                ObstructionDrop::Overflow => {
                    self.end(GameOverCause::StormOverflow);
                    return;
                }
            }
        }
        if tick.storm_ended {
            self.events.push(GameEvent::StormEnded);
        }
    }

    fn inject_garbage(&mut self, rows: &[Row]) -> bool {
        if !self.board.inject_garbage_rows(rows) {
            self.end(GameOverCause::GarbageOverflow);
            return false;
        }
        self.events.push(GameEvent::GarbageInjected { rows: rows.len() });
        if !self.active.raise(rows.len(), &self.board) {
            self.end(GameOverCause::GarbageOverflow);
            return false;
        }
        true
    }

    fn end(&mut self, cause: GameOverCause) {
        self.status = SessionStatus::GameOver;
        self.game_over = Some(cause);
        self.inputs.clear();
        self.events.push(GameEvent::GameOver {
            cause,
            score: self.final_score(),
        });
    }

    pub fn board_mut_for_test(&mut self) -> &mut Board {
        &mut self.board
    }

    pub fn set_active_for_test(&mut self, piece: Piece) {
        self.active = ActivePiece::new(piece, self.rules.lock);
    }
}

fn run_seed(seed: u64, session_id: u64) -> u64 {
    seed.wrapping_add(session_id.wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

fn injector_seed(seed: u64, session_id: u64) -> u64 {
    run_seed(seed, session_id) ^ 0xD1B5_4A32_D192_ED03
}
