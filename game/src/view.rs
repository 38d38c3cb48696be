//! Render-facing snapshot of a session and the sink trait renderers
//! implement. The engine never draws; hosts pull a `FrameView` after each
//! tick and hand it to whatever presents it.

use std::fmt::Write as _;
use std::io;

use serde::Serialize;

use crate::board::{COLS, ROWS};
use crate::piece::{CELL_EMPTY, Piece, PieceKind};
use crate::session::{GameSession, SessionStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PieceView {
    pub kind: PieceKind,
    pub shape: Vec<Vec<u8>>,
    pub col: i32,
    pub row: i32,
}

impl From<&Piece> for PieceView {
    fn from(piece: &Piece) -> Self {
        Self {
            kind: piece.kind,
            shape: piece.shape.rows(),
            col: piece.col,
            row: piece.row,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameView {
    pub board: Vec<Vec<u8>>,
    pub active: PieceView,
    pub ghost_row: i32,
    pub next: PieceView,
    pub score: u32,
    pub lines: u32,
    pub level: u32,
    pub combo: u32,
    pub status: SessionStatus,
    pub storm_active: bool,
    pub elapsed_ms: u64,
    pub session_id: u64,
}

impl FrameView {
    pub fn capture(session: &GameSession) -> Self {
        let progress = session.progress();
        Self {
            board: session.board().rows().iter().map(|row| row.to_vec()).collect(),
            active: PieceView::from(session.active().piece()),
            ghost_row: session.ghost().row,
            next: PieceView::from(session.next_piece()),
            score: progress.score(),
            lines: progress.lines(),
            level: progress.level(),
            combo: progress.combo(),
            status: session.status(),
            storm_active: session.injector().storm_active(),
            elapsed_ms: session.elapsed().as_millis() as u64,
            session_id: session.session_id(),
        }
    }

    /// Board with the active piece drawn in; cells above the board are dropped.
    pub fn composite(&self) -> Vec<Vec<u8>> {
        let mut board = self.board.clone();
        for (r, row) in self.active.shape.iter().enumerate() {
            for (c, &value) in row.iter().enumerate() {
                if value == CELL_EMPTY {
                    continue;
                }
                let board_row = self.active.row + r as i32;
                let board_col = self.active.col + c as i32;
                if (0..ROWS as i32).contains(&board_row) && (0..COLS as i32).contains(&board_col) {
                    board[board_row as usize][board_col as usize] = value;
                }
            }
        }
        board
    }

    pub fn fingerprint(&self) -> io::Result<String> {
        engine::fingerprint::json_sha256_hex(self)
    }
}

pub trait RenderSink {
    fn render(&mut self, frame: &FrameView) -> io::Result<()>;
}

/// Plain-text renderer used by the CLI. Each frame replaces `output`.
#[derive(Debug, Default)]
pub struct TextRenderer {
    output: String,
    frames: u64,
}

impl TextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

fn cell_char(value: u8) -> char {
    PieceKind::from_id(value).map(PieceKind::label).unwrap_or('.')
}

impl RenderSink for TextRenderer {
    fn render(&mut self, frame: &FrameView) -> io::Result<()> {
        let to_io = |e: std::fmt::Error| io::Error::other(e);
        self.output.clear();

        let composite = frame.composite();
        for (row_index, row) in composite.iter().enumerate() {
            self.output.push('|');
            for (col, &value) in row.iter().enumerate() {
                let ghost = value == CELL_EMPTY
                    && row_index as i32 >= frame.ghost_row
                    && frame.ghost_row != frame.active.row
                    && is_ghost_cell(frame, row_index as i32, col as i32);
                self.output.push(if ghost { ':' } else { cell_char(value) });
            }
            self.output.push_str("|\n");
        }
        writeln!(self.output, "+{}+", "-".repeat(COLS)).map_err(to_io)?;
        writeln!(
            self.output,
            "score {}  lines {}  level {}  combo {}  next {}",
            frame.score,
            frame.lines,
            frame.level,
            frame.combo,
            frame.next.kind.label()
        )
        .map_err(to_io)?;
        match frame.status {
            SessionStatus::Paused => self.output.push_str("PAUSED\n"),
            SessionStatus::GameOver => self.output.push_str("GAME OVER\n"),
            SessionStatus::Ready => self.output.push_str("press start\n"),
            SessionStatus::Running if frame.storm_active => self.output.push_str("STORM\n"),
            SessionStatus::Running => {}
        }
        self.frames += 1;
        Ok(())
    }
}

fn is_ghost_cell(frame: &FrameView, row: i32, col: i32) -> bool {
    let d_row = row - frame.ghost_row;
    let d_col = col - frame.active.col;
    if d_row < 0 || d_col < 0 {
        return false;
    }
    frame
        .active
        .shape
        .get(d_row as usize)
        .and_then(|r| r.get(d_col as usize))
        .is_some_and(|&value| value != CELL_EMPTY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionRules;

    #[test]
    fn composite_overlays_active_piece_without_touching_board() {
        let mut session = GameSession::new(4, SessionRules::default());
        session.start();
        let frame = FrameView::capture(&session);
        let composite = frame.composite();

        let piece = session.active().piece();
        for (row, col) in piece.cells() {
            assert_eq!(composite[row as usize][col as usize], piece.kind.id());
        }
        assert!(frame.board.iter().flatten().all(|&cell| cell == CELL_EMPTY));
    }

    #[test]
    fn text_renderer_draws_well_and_stats() {
        let mut session = GameSession::new(4, SessionRules::default());
        session.start();
        let mut renderer = TextRenderer::new();
        renderer
            .render(&FrameView::capture(&session))
            .expect("render");

        let lines: Vec<_> = renderer.output().lines().collect();
        assert_eq!(lines.len(), ROWS + 2);
        assert!(lines[0].starts_with('|'));
        assert_eq!(lines[ROWS], format!("+{}+", "-".repeat(COLS)));
        assert!(lines[ROWS + 1].starts_with("score 0"));
        let label = session.active().piece().kind.label();
        assert!(renderer.output().contains(label));
        assert!(renderer.output().contains(':'), "ghost shown below the piece");
        assert_eq!(renderer.frames(), 1);
    }

    #[test]
    fn equal_sessions_share_a_fingerprint() {
        let mut a = GameSession::new(8, SessionRules::default());
        let mut b = GameSession::new(8, SessionRules::default());
        a.start();
        b.start();
        let fa = FrameView::capture(&a).fingerprint().expect("digest");
        let fb = FrameView::capture(&b).fingerprint().expect("digest");
        assert_eq!(fa, fb);
        assert_eq!(fa.len(), 64);
    }
}
