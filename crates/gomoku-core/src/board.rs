use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default board side length used by the server.
pub const BOARD_SIZE: usize = 15;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Symbol {
    X,
    O,
}

impl Symbol {
    /// The opposing symbol.
    pub fn other(&self) -> Symbol {
        match self {
            Symbol::X => Symbol::O,
            Symbol::O => Symbol::X,
        }
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Symbol::X => write!(f, "X"),
            Symbol::O => write!(f, "O"),
        }
    }
}

/// A cell is either empty or holds a placed symbol.
pub type Cell = Option<Symbol>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error("cell ({row}, {col}) is out of bounds")]
    OutOfBounds { row: usize, col: usize },
    #[error("cell ({row}, {col}) is already occupied")]
    Occupied { row: usize, col: usize },
}

/// An N x N grid of cells. Turn and seat legality are enforced by the
/// caller; the board itself only rejects out-of-bounds and occupied cells.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    size: usize,
    cells: Vec<Cell>,
}

impl Board {
    pub fn new(size: usize) -> Board {
        Board {
            size,
            cells: vec![None; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, row: usize, col: usize) -> Cell {
        if row < self.size && col < self.size {
            self.cells[row * self.size + col]
        } else {
            None
        }
    }

    /// Place `symbol` at (row, col). The cell must be empty.
    pub fn apply_move(&mut self, row: usize, col: usize, symbol: Symbol) -> Result<(), BoardError> {
        if row >= self.size || col >= self.size {
            return Err(BoardError::OutOfBounds { row, col });
        }
        let idx = row * self.size + col;
        if self.cells[idx].is_some() {
            return Err(BoardError::Occupied { row, col });
        }
        self.cells[idx] = Some(symbol);
        Ok(())
    }

    /// True when no empty cells remain (forced draw).
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|c| c.is_some())
    }

    /// Number of occupied cells.
    pub fn move_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Row-major wire representation: `null` for empty cells.
    pub fn to_rows(&self) -> Vec<Vec<Cell>> {
        (0..self.size)
            .map(|r| (0..self.size).map(|c| self.get(r, c)).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_board_is_empty() {
        let board = Board::new(BOARD_SIZE);
        assert_eq!(board.size(), 15);
        assert_eq!(board.move_count(), 0);
        assert!(!board.is_full());
    }

    #[test]
    fn apply_move_sets_cell() {
        let mut board = Board::new(BOARD_SIZE);
        board.apply_move(7, 7, Symbol::X).unwrap();
        assert_eq!(board.get(7, 7), Some(Symbol::X));
        assert_eq!(board.move_count(), 1);
    }

    #[test]
    fn apply_move_rejects_occupied_cell() {
        let mut board = Board::new(BOARD_SIZE);
        board.apply_move(0, 0, Symbol::X).unwrap();
        let err = board.apply_move(0, 0, Symbol::O).unwrap_err();
        assert_eq!(err, BoardError::Occupied { row: 0, col: 0 });
        // Board unchanged.
        assert_eq!(board.get(0, 0), Some(Symbol::X));
    }

    #[test]
    fn apply_move_rejects_out_of_bounds() {
        let mut board = Board::new(BOARD_SIZE);
        let err = board.apply_move(15, 0, Symbol::X).unwrap_err();
        assert_eq!(err, BoardError::OutOfBounds { row: 15, col: 0 });
        assert_eq!(board.move_count(), 0);
    }

    #[test]
    fn alternating_moves_keep_symbol_counts_balanced() {
        let mut board = Board::new(BOARD_SIZE);
        let mut symbol = Symbol::X;
        for i in 0..20 {
            board.apply_move(i / 15, i % 15, symbol).unwrap();
            let x = (0..15)
                .flat_map(|r| (0..15).map(move |c| (r, c)))
                .filter(|&(r, c)| board.get(r, c) == Some(Symbol::X))
                .count();
            let o = board.move_count() - x;
            // X moves first, so X leads by 0 or 1 after every move.
            assert!(x == o || x == o + 1);
            symbol = symbol.other();
        }
    }

    #[test]
    fn small_board_fills_up() {
        let mut board = Board::new(2);
        let mut symbol = Symbol::X;
        for r in 0..2 {
            for c in 0..2 {
                board.apply_move(r, c, symbol).unwrap();
                symbol = symbol.other();
            }
        }
        assert!(board.is_full());
    }
}
