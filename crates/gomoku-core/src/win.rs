use crate::board::{Board, Symbol};

/// Number of contiguous same-symbol cells that wins the game.
pub const WIN_LEN: usize = 5;

/// Check whether `symbol` has five in a row anywhere on the board.
///
/// The scan slides a window of [`WIN_LEN`] over every row, column and both
/// diagonal directions, so an overline (a run of 6 or more) also counts as
/// a win: every longer run contains at least one full window.
pub fn check_winner(board: &Board, symbol: Symbol) -> bool {
    let size = board.size();
    if size < WIN_LEN {
        return false;
    }

    // (row step, col step) for each axis: rows, columns, both diagonals.
    const DIRECTIONS: [(usize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

    for row in 0..size {
        for col in 0..size {
            for (dr, dc) in DIRECTIONS {
                if !window_fits(size, row, col, dr, dc) {
                    continue;
                }
                let hit = (0..WIN_LEN).all(|i| {
                    let r = row + dr * i;
                    let c = (col as isize + dc * i as isize) as usize;
                    board.get(r, c) == Some(symbol)
                });
                if hit {
                    return true;
                }
            }
        }
    }
    false
}

fn window_fits(size: usize, row: usize, col: usize, dr: usize, dc: isize) -> bool {
    let end_row = row + dr * (WIN_LEN - 1);
    let end_col = col as isize + dc * (WIN_LEN as isize - 1);
    end_row < size && end_col >= 0 && (end_col as usize) < size
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BOARD_SIZE;

    fn board_with(moves: &[(usize, usize, Symbol)]) -> Board {
        let mut board = Board::new(BOARD_SIZE);
        for &(r, c, s) in moves {
            board.apply_move(r, c, s).unwrap();
        }
        board
    }

    #[test]
    fn empty_board_has_no_winner() {
        let board = Board::new(BOARD_SIZE);
        assert!(!check_winner(&board, Symbol::X));
        assert!(!check_winner(&board, Symbol::O));
    }

    #[test]
    fn horizontal_run_of_five_wins() {
        // Scenario: X at row 0, cols 0-4.
        let board = board_with(&[
            (0, 0, Symbol::X),
            (0, 1, Symbol::X),
            (0, 2, Symbol::X),
            (0, 3, Symbol::X),
            (0, 4, Symbol::X),
        ]);
        assert!(check_winner(&board, Symbol::X));
        assert!(!check_winner(&board, Symbol::O));
    }

    #[test]
    fn vertical_run_of_five_wins() {
        let board = board_with(&[
            (3, 7, Symbol::O),
            (4, 7, Symbol::O),
            (5, 7, Symbol::O),
            (6, 7, Symbol::O),
            (7, 7, Symbol::O),
        ]);
        assert!(check_winner(&board, Symbol::O));
    }

    #[test]
    fn main_diagonal_run_wins() {
        let board = board_with(&[
            (2, 2, Symbol::X),
            (3, 3, Symbol::X),
            (4, 4, Symbol::X),
            (5, 5, Symbol::X),
            (6, 6, Symbol::X),
        ]);
        assert!(check_winner(&board, Symbol::X));
    }

    #[test]
    fn anti_diagonal_run_wins() {
        let board = board_with(&[
            (2, 10, Symbol::X),
            (3, 9, Symbol::X),
            (4, 8, Symbol::X),
            (5, 7, Symbol::X),
            (6, 6, Symbol::X),
        ]);
        assert!(check_winner(&board, Symbol::X));
    }

    #[test]
    fn run_of_four_does_not_win() {
        let board = board_with(&[
            (0, 0, Symbol::X),
            (0, 1, Symbol::X),
            (0, 2, Symbol::X),
            (0, 3, Symbol::X),
        ]);
        assert!(!check_winner(&board, Symbol::X));
    }

    #[test]
    fn interrupted_run_does_not_win() {
        let board = board_with(&[
            (0, 0, Symbol::X),
            (0, 1, Symbol::X),
            (0, 2, Symbol::O),
            (0, 3, Symbol::X),
            (0, 4, Symbol::X),
            (0, 5, Symbol::X),
        ]);
        assert!(!check_winner(&board, Symbol::X));
    }

    #[test]
    fn overline_counts_as_win() {
        // Policy: six or more in a row is still a win.
        let board = board_with(&[
            (8, 2, Symbol::O),
            (8, 3, Symbol::O),
            (8, 4, Symbol::O),
            (8, 5, Symbol::O),
            (8, 6, Symbol::O),
            (8, 7, Symbol::O),
        ]);
        assert!(check_winner(&board, Symbol::O));
    }

    #[test]
    fn run_at_board_edge_wins() {
        let board = board_with(&[
            (14, 10, Symbol::X),
            (14, 11, Symbol::X),
            (14, 12, Symbol::X),
            (14, 13, Symbol::X),
            (14, 14, Symbol::X),
        ]);
        assert!(check_winner(&board, Symbol::X));
    }

    #[test]
    fn run_does_not_wrap_across_rows() {
        // Three at the end of row 0 plus two at the start of row 1.
        let board = board_with(&[
            (0, 12, Symbol::X),
            (0, 13, Symbol::X),
            (0, 14, Symbol::X),
            (1, 0, Symbol::X),
            (1, 1, Symbol::X),
        ]);
        assert!(!check_winner(&board, Symbol::X));
    }
}
