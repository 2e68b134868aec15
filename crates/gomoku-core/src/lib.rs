pub mod board;
pub mod protocol;
pub mod win;

pub use board::{Board, BoardError, Cell, Symbol, BOARD_SIZE};
pub use protocol::{ClientMessage, GameResult, ServerMessage};
pub use win::{check_winner, WIN_LEN};
