use serde::{Deserialize, Serialize};

use crate::piece::{CELL_EMPTY, CELL_OBSTRUCTION, Piece};

pub const COLS: usize = 10;
pub const ROWS: usize = 20;

pub type Row = [u8; COLS];

pub const EMPTY_ROW: Row = [CELL_EMPTY; COLS];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOutcome {
    Placed,
    /// Part of the piece sat above the board; nothing was written.
    TopOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObstructionDrop {
    Landed { row: usize },
    /// The entry cell is covered by the active piece.
    Skipped,
    /// The column is filled up to the top row.
    Overflow,
}

/// Row 0 is the top of the well, row `ROWS - 1` the floor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    cells: [Row; ROWS],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Self {
            cells: [EMPTY_ROW; ROWS],
        }
    }

    pub fn from_rows(cells: [Row; ROWS]) -> Self {
        Self { cells }
    }

    pub fn rows(&self) -> &[Row; ROWS] {
        &self.cells
    }

    pub fn row(&self, row: usize) -> Option<&Row> {
        self.cells.get(row)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<u8> {
        self.cells.get(row).and_then(|r| r.get(col)).copied()
    }

    pub fn set_cell(&mut self, row: usize, col: usize, value: u8) {
        if row < ROWS && col < COLS {
            self.cells[row][col] = value;
        }
    }

    pub fn set_row(&mut self, row: usize, values: Row) {
        if row < ROWS {
            self.cells[row] = values;
        }
    }

    pub fn clear(&mut self) {
        self.cells = [EMPTY_ROW; ROWS];
    }

    /// Coordinates off the board are never empty.
    pub fn is_empty(&self, row: i32, col: i32) -> bool {
        if row < 0 || col < 0 {
            return false;
        }
        self.cell(row as usize, col as usize) == Some(CELL_EMPTY)
    }

    pub fn collides(&self, piece: &Piece) -> bool {
        piece.cells().any(|(row, col)| {
            if col < 0 || col >= COLS as i32 || row >= ROWS as i32 {
                return true;
            }
            row >= 0 && !self.is_empty(row, col)
        })
    }

    pub fn lock(&mut self, piece: &Piece) -> LockOutcome {
        if piece.cells().any(|(row, _)| row < 0) {
            return LockOutcome::TopOut;
        }
        let value = piece.kind.id();
        for (row, col) in piece.cells() {
            debug_assert!(row < ROWS as i32 && col >= 0 && col < COLS as i32);
            self.set_cell(row as usize, col as usize, value);
        }
        LockOutcome::Placed
    }

    pub fn is_row_full(&self, row: usize) -> bool {
        self.cells
            .get(row)
            .is_some_and(|r| r.iter().all(|&cell| cell != CELL_EMPTY))
    }

    pub fn is_top_row_empty(&self) -> bool {
        self.cells[0].iter().all(|&cell| cell == CELL_EMPTY)
    }

    /// Removes full rows bottom-up, letting everything above fall one row per
    /// cleared line. Returns how many rows were removed.
    pub fn clear_lines(&mut self) -> usize {
        let mut cleared = 0;
        let mut row = ROWS;
        while row > 0 {
            let current = row - 1;
            if self.is_row_full(current) {
                self.cells.copy_within(0..current, 1);
                self.cells[0] = EMPTY_ROW;
                cleared += 1;
                // A new row slid into `current`; examine it again.
                continue;
            }
            row -= 1;
        }
        cleared
    }

    /// Pushes the stack up by `rows.len()` and writes `rows` at the bottom
    /// in order. Refuses (leaving the board untouched) when the top row is
    /// already occupied.
    pub fn inject_garbage_rows(&mut self, rows: &[Row]) -> bool {
        if !self.is_top_row_empty() {
            return false;
        }
        let n = rows.len().min(ROWS);
        if n == 0 {
            return true;
        }
        self.cells.copy_within(n.., 0);
        for (i, garbage) in rows[..n].iter().enumerate() {
            self.cells[ROWS - n + i] = *garbage;
        }
        true
    }

    /// Drops one obstruction cell down `col` from the top row until it rests
    /// on the stack, the floor, or a cell in `blocked` (the falling piece).
    pub fn drop_obstruction(&mut self, col: usize, blocked: &[(i32, i32)]) -> ObstructionDrop {
        if col >= COLS {
            return ObstructionDrop::Skipped;
        }
        let is_blocked = |row: usize| blocked.contains(&(row as i32, col as i32));

        if self.cells[0][col] != CELL_EMPTY {
            return ObstructionDrop::Overflow;
        }
        if is_blocked(0) {
            return ObstructionDrop::Skipped;
        }

        let mut row = 0;
        while row + 1 < ROWS && self.cells[row + 1][col] == CELL_EMPTY && !is_blocked(row + 1) {
            row += 1;
        }
        self.cells[row][col] = CELL_OBSTRUCTION;
        ObstructionDrop::Landed { row }
    }

    /// Number of rows from the floor up to and including the highest filled
    /// cell in `col`.
    pub fn height_of(&self, col: usize) -> usize {
        if col >= COLS {
            return 0;
        }
        (0..ROWS)
            .find(|&row| self.cells[row][col] != CELL_EMPTY)
            .map(|row| ROWS - row)
            .unwrap_or(0)
    }

    pub fn filled_cells(&self) -> usize {
        self.cells
            .iter()
            .flat_map(|row| row.iter())
            .filter(|&&cell| cell != CELL_EMPTY)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::PieceKind;

    fn full_row(value: u8) -> Row {
        [value; COLS]
    }

    #[test]
    fn collides_against_walls_and_floor_regardless_of_row_sign() {
        let board = Board::new();
        // O piece occupies its whole 2x2 matrix.
        assert!(board.collides(&Piece::at(PieceKind::O, -1, 5)));
        assert!(board.collides(&Piece::at(PieceKind::O, -1, -3)));
        assert!(board.collides(&Piece::at(PieceKind::O, COLS as i32 - 1, 5)));
        assert!(board.collides(&Piece::at(PieceKind::O, COLS as i32 - 1, -3)));
        assert!(board.collides(&Piece::at(PieceKind::O, 3, ROWS as i32 - 1)));
        assert!(!board.collides(&Piece::at(PieceKind::O, 3, ROWS as i32 - 2)));
    }

    #[test]
    fn cells_above_the_board_ignore_stack_contents() {
        let mut board = Board::new();
        board.set_row(0, full_row(1));
        // Entirely above row 0: no vertical collision.
        assert!(!board.collides(&Piece::at(PieceKind::O, 4, -2)));
        // Lower half reaches row 0 which is filled.
        assert!(board.collides(&Piece::at(PieceKind::O, 4, -1)));
    }

    #[test]
    fn lock_writes_kind_ids() {
        let mut board = Board::new();
        let piece = Piece::at(PieceKind::T, 0, 18);
        assert_eq!(board.lock(&piece), LockOutcome::Placed);
        assert_eq!(board.cell(18, 1), Some(6));
        assert_eq!(board.cell(19, 0), Some(6));
        assert_eq!(board.cell(19, 1), Some(6));
        assert_eq!(board.cell(19, 2), Some(6));
        assert_eq!(board.filled_cells(), 4);
    }

    #[test]
    fn lock_above_board_is_top_out_and_writes_nothing() {
        let mut board = Board::new();
        let piece = Piece::at(PieceKind::O, 4, -1);
        assert_eq!(board.lock(&piece), LockOutcome::TopOut);
        assert_eq!(board, Board::new());
    }

    #[test]
    fn clear_lines_without_full_rows_is_a_no_op() {
        let mut board = Board::new();
        board.set_cell(19, 0, 3);
        board.set_cell(10, 5, 8);
        let before = board.clone();
        assert_eq!(board.clear_lines(), 0);
        assert_eq!(board, before);
    }

    #[test]
    fn clears_three_bottom_rows_and_shifts_stack() {
        let mut board = Board::new();
        for row in 17..20 {
            board.set_row(row, full_row(2));
        }
        let mut partial = EMPTY_ROW;
        partial[0] = 5;
        partial[7] = 8;
        board.set_row(16, partial);
        board.set_cell(3, 9, 1);
        let before = board.clone();

        assert_eq!(board.clear_lines(), 3);
        assert_eq!(board.row(19), Some(&partial));
        for row in 0..=16 {
            assert_eq!(board.row(row + 3), before.row(row), "row {row} shifted by 3");
        }
        for row in 0..3 {
            assert_eq!(board.row(row), Some(&EMPTY_ROW));
        }
    }

    #[test]
    fn clears_non_adjacent_full_rows() {
        let mut board = Board::new();
        board.set_row(19, full_row(1));
        board.set_cell(18, 4, 7);
        board.set_row(17, full_row(1));
        board.set_cell(16, 2, 3);

        assert_eq!(board.clear_lines(), 2);
        assert_eq!(board.cell(19, 4), Some(7));
        assert_eq!(board.cell(18, 2), Some(3));
        assert_eq!(board.filled_cells(), 2);
    }

    #[test]
    fn inject_garbage_pushes_stack_up() {
        let mut board = Board::new();
        board.set_cell(19, 0, 4);
        let mut garbage = full_row(CELL_OBSTRUCTION);
        garbage[3] = CELL_EMPTY;

        assert!(board.inject_garbage_rows(&[garbage]));
        assert_eq!(board.cell(18, 0), Some(4));
        assert_eq!(board.row(19), Some(&garbage));
    }

    #[test]
    fn inject_garbage_refuses_when_top_row_occupied() {
        let mut board = Board::new();
        board.set_cell(0, 6, 2);
        let before = board.clone();

        assert!(!board.inject_garbage_rows(&[full_row(CELL_OBSTRUCTION)]));
        assert_eq!(board, before);
    }

    #[test]
    fn obstruction_falls_to_stack_or_stops_above_active_piece() {
        let mut board = Board::new();
        board.set_cell(19, 2, 1);
        assert_eq!(board.drop_obstruction(2, &[]), ObstructionDrop::Landed { row: 18 });
        assert_eq!(board.drop_obstruction(0, &[]), ObstructionDrop::Landed { row: 19 });
        assert_eq!(
            board.drop_obstruction(5, &[(10, 5)]),
            ObstructionDrop::Landed { row: 9 }
        );
        assert_eq!(board.drop_obstruction(6, &[(0, 6)]), ObstructionDrop::Skipped);
        assert_eq!(board.cell(18, 2), Some(CELL_OBSTRUCTION));
    }

    #[test]
    fn obstruction_into_full_column_overflows() {
        let mut board = Board::new();
        board.set_cell(0, 1, 3);
        assert_eq!(board.drop_obstruction(1, &[]), ObstructionDrop::Overflow);
    }

    #[test]
    fn height_counts_from_floor() {
        let mut board = Board::new();
        assert_eq!(board.height_of(0), 0);
        board.set_cell(15, 0, 1);
        assert_eq!(board.height_of(0), 5);
    }
}
