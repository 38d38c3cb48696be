//! 7-bag piece generator.
//!
//! Every run of seven draws starting from an empty bag deals each tetromino
//! exactly once; the bag is reshuffled when it runs dry.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::piece::{Piece, PieceKind};

#[derive(Debug, Clone)]
pub struct PieceGenerator {
    bag: Vec<PieceKind>,
    rng: StdRng,
}

impl PieceGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            bag: Vec::with_capacity(PieceKind::TETROMINOES.len()),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn next_kind(&mut self) -> PieceKind {
        if self.bag.is_empty() {
            self.refill();
        }
        // refill() always leaves seven kinds behind.
        self.bag.pop().unwrap_or(PieceKind::T)
    }

    /// Next piece at its spawn position and orientation.
    pub fn next_piece(&mut self) -> Piece {
        Piece::spawn(self.next_kind())
    }

    /// Kinds left in the current bag; the last element is dealt next.
    pub fn peek_bag(&self) -> &[PieceKind] {
        &self.bag
    }

    /// Discards the current bag; the next draw starts a fresh one.
    pub fn reset(&mut self) {
        self.bag.clear();
    }

    fn refill(&mut self) {
        self.bag.extend_from_slice(&PieceKind::TETROMINOES);
        self.bag.shuffle(&mut self.rng);
    }
}
