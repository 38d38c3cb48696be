use serde::{Deserialize, Serialize};

use crate::board::COLS;

pub const CELL_EMPTY: u8 = 0;
pub const CELL_OBSTRUCTION: u8 = 8;

const MAX_SHAPE_SIZE: usize = 4;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PieceKind {
    I,
    J,
    L,
    O,
    S,
    T,
    Z,
    Obstruction,
}

impl PieceKind {
    /// The seven tetrominoes dealt by the bag, in cell-id order.
    pub const TETROMINOES: [PieceKind; 7] = [
        PieceKind::I,
        PieceKind::J,
        PieceKind::L,
        PieceKind::O,
        PieceKind::S,
        PieceKind::T,
        PieceKind::Z,
    ];

    /// Board cell value written when this kind locks.
    pub const fn id(self) -> u8 {
        match self {
            PieceKind::I => 1,
            PieceKind::J => 2,
            PieceKind::L => 3,
            PieceKind::O => 4,
            PieceKind::S => 5,
            PieceKind::T => 6,
            PieceKind::Z => 7,
            PieceKind::Obstruction => CELL_OBSTRUCTION,
        }
    }

    pub fn from_id(id: u8) -> Option<PieceKind> {
        match id {
            1 => Some(PieceKind::I),
            2 => Some(PieceKind::J),
            3 => Some(PieceKind::L),
            4 => Some(PieceKind::O),
            5 => Some(PieceKind::S),
            6 => Some(PieceKind::T),
            7 => Some(PieceKind::Z),
            CELL_OBSTRUCTION => Some(PieceKind::Obstruction),
            _ => None,
        }
    }

    pub fn label(self) -> char {
        match self {
            PieceKind::I => 'I',
            PieceKind::J => 'J',
            PieceKind::L => 'L',
            PieceKind::O => 'O',
            PieceKind::S => 'S',
            PieceKind::T => 'T',
            PieceKind::Z => 'Z',
            PieceKind::Obstruction => '#',
        }
    }
}

/// Square occupancy matrix; occupied entries hold the kind id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    size: usize,
    cells: [u8; MAX_SHAPE_SIZE * MAX_SHAPE_SIZE],
}

impl Shape {
    pub fn spawn(kind: PieceKind) -> Shape {
        let v = kind.id();
        match kind {
            PieceKind::I => Shape::from_rows(&[
                &[0, 0, 0, 0],
                &[v, v, v, v],
                &[0, 0, 0, 0],
                &[0, 0, 0, 0],
            ]),
            PieceKind::J => Shape::from_rows(&[&[v, 0, 0], &[v, v, v], &[0, 0, 0]]),
            PieceKind::L => Shape::from_rows(&[&[0, 0, v], &[v, v, v], &[0, 0, 0]]),
            PieceKind::O => Shape::from_rows(&[&[v, v], &[v, v]]),
            PieceKind::S => Shape::from_rows(&[&[0, v, v], &[v, v, 0], &[0, 0, 0]]),
            PieceKind::T => Shape::from_rows(&[&[0, v, 0], &[v, v, v], &[0, 0, 0]]),
            PieceKind::Z => Shape::from_rows(&[&[v, v, 0], &[0, v, v], &[0, 0, 0]]),
            PieceKind::Obstruction => Shape::from_rows(&[&[v]]),
        }
    }

    /// Builds a shape from square rows. Panics on non-square input or sizes
    /// above 4; shapes are static tables.
    pub fn from_rows(rows: &[&[u8]]) -> Shape {
        let size = rows.len();
        assert!(size > 0 && size <= MAX_SHAPE_SIZE, "shape size {size}");
        let mut cells = [0u8; MAX_SHAPE_SIZE * MAX_SHAPE_SIZE];
        for (r, row) in rows.iter().enumerate() {
            assert_eq!(row.len(), size, "shape rows must be square");
            for (c, &v) in row.iter().enumerate() {
                cells[r * size + c] = v;
            }
        }
        Shape { size, cells }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn cell(&self, row: usize, col: usize) -> u8 {
        debug_assert!(row < self.size && col < self.size);
        self.cells[row * self.size + col]
    }

    pub fn is_filled(&self, row: usize, col: usize) -> bool {
        self.cell(row, col) != CELL_EMPTY
    }

    /// Quarter turn clockwise: `new[r][c] = old[n-1-c][r]`.
    pub fn rotated_cw(&self) -> Shape {
        let n = self.size;
        let mut rotated = Shape {
            size: n,
            cells: [0u8; MAX_SHAPE_SIZE * MAX_SHAPE_SIZE],
        };
        for r in 0..n {
            for c in 0..n {
                rotated.cells[r * n + c] = self.cells[(n - 1 - c) * n + r];
            }
        }
        rotated
    }

    /// Occupied `(row, col)` offsets inside the matrix.
    pub fn offsets(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.size)
            .flat_map(move |r| (0..self.size).map(move |c| (r, c)))
            .filter(move |&(r, c)| self.is_filled(r, c))
    }

    pub fn rows(&self) -> Vec<Vec<u8>> {
        (0..self.size)
            .map(|r| (0..self.size).map(|c| self.cell(r, c)).collect())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub kind: PieceKind,
    pub shape: Shape,
    /// Board column of the shape's left edge.
    pub col: i32,
    /// Board row of the shape's top edge; negative while above the board.
    pub row: i32,
}

impl Piece {
    pub fn spawn(kind: PieceKind) -> Piece {
        Piece {
            kind,
            shape: Shape::spawn(kind),
            col: (COLS / 2) as i32 - 1,
            row: 0,
        }
    }

    pub fn at(kind: PieceKind, col: i32, row: i32) -> Piece {
        Piece {
            col,
            row,
            ..Piece::spawn(kind)
        }
    }

    pub fn translated(&self, d_col: i32, d_row: i32) -> Piece {
        Piece {
            col: self.col + d_col,
            row: self.row + d_row,
            ..*self
        }
    }

    pub fn rotated(&self) -> Piece {
        Piece {
            shape: self.shape.rotated_cw(),
            ..*self
        }
    }

    /// Board `(row, col)` coordinates of every occupied cell.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.shape
            .offsets()
            .map(move |(r, c)| (self.row + r as i32, self.col + c as i32))
    }
}
