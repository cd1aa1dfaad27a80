use serde::{Deserialize, Serialize};

use crate::crush::tile::Tile;
use crate::gomoku::board::Stone;

/// A board coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: u8,
    pub col: u8,
}

impl Position {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// True for 4-neighbours; diagonal and identical cells are not adjacent.
    pub fn is_adjacent(self, other: Position) -> bool {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col) == 1
    }
}

/// Public Gomoku state returned from WASM APIs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GomokuState {
    /// Row-major, `board_size * board_size` cells.
    pub board: Vec<Option<Stone>>,
    pub current_player: Stone,
    pub is_game_over: bool,
    /// Contract:
    /// - `Some` once a five-in-a-row has been completed.
    /// - `None` while playing, and after a drawn (full) board.
    pub winner: Option<Stone>,
    pub last_move: Option<Position>,
    /// Cells of the completed run, empty until somebody wins.
    pub winning_line: Vec<Position>,
}

/// Public Match-3 state returned from WASM APIs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridSnapshot {
    pub size: u8,
    /// Row-major cells; `None` only while a resolution pass is pending.
    pub cells: Vec<Option<Tile>>,
    pub score: u64,
    pub is_idle: bool,
    pub combo: u32,
    pub clean_one_remaining: u32,
    pub forced_swap_remaining: u32,
    pub shuffle_remaining: u32,
}
