use serde::{Deserialize, Serialize};

use crate::types::Position;

pub const BOARD_SIZE: usize = 15;
pub const NUM_CELLS: usize = BOARD_SIZE * BOARD_SIZE;
pub const CENTER: Position = Position::new(7, 7);

/// Stone colour. Black always moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stone {
    Black,
    White,
}

impl Stone {
    pub fn opponent(self) -> Self {
        match self {
            Stone::Black => Stone::White,
            Stone::White => Stone::Black,
        }
    }

    /// 1 = black, 2 = white; 0 is reserved for an empty cell.
    pub fn code(self) -> u8 {
        match self {
            Stone::Black => 1,
            Stone::White => 2,
        }
    }
}

/// 15x15 Gomoku board, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: [Option<Stone>; NUM_CELLS],
}

impl Board {
    pub fn new() -> Self {
        Self {
            cells: [None; NUM_CELLS],
        }
    }

    /// Rebuilds a board from a flattened record. Returns `None` on a length mismatch.
    pub fn from_cells(cells: &[Option<Stone>]) -> Option<Self> {
        let cells: [Option<Stone>; NUM_CELLS] = cells.try_into().ok()?;
        Some(Self { cells })
    }

    pub fn get(&self, row: usize, col: usize) -> Option<Stone> {
        if row < BOARD_SIZE && col < BOARD_SIZE {
            self.cells[row * BOARD_SIZE + col]
        } else {
            None
        }
    }

    pub fn is_empty_at(&self, row: usize, col: usize) -> bool {
        in_bounds(row as i32, col as i32) && self.cells[row * BOARD_SIZE + col].is_none()
    }

    /// Places one stone on an empty cell.
    /// Returns `false` and leaves the board untouched when the cell is occupied or off-board.
    pub fn place(&mut self, row: usize, col: usize, stone: Stone) -> bool {
        if !self.is_empty_at(row, col) {
            return false;
        }
        self.cells[row * BOARD_SIZE + col] = Some(stone);
        true
    }

    /// Returns a copy with one extra stone; used to evaluate hypothetical moves.
    pub fn with_stone(&self, row: usize, col: usize, stone: Stone) -> Option<Self> {
        let mut next = self.clone();
        next.place(row, col, stone).then_some(next)
    }

    /// Empty cells in row-major scan order.
    pub fn empty_cells(&self) -> impl Iterator<Item = Position> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_none())
            .map(|(idx, _)| index_to_pos(idx))
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    /// Returns `(black_count, white_count)`.
    pub fn count(&self) -> (usize, usize) {
        self.cells.iter().fold((0, 0), |(b, w), cell| match cell {
            Some(Stone::Black) => (b + 1, w),
            Some(Stone::White) => (b, w + 1),
            None => (b, w),
        })
    }

    pub fn to_vec(&self) -> Vec<Option<Stone>> {
        self.cells.to_vec()
    }

    /// Converts board to `[u8; 225]` where 0=empty, 1=black, 2=white.
    pub fn to_array(&self) -> [u8; NUM_CELLS] {
        let mut out = [0u8; NUM_CELLS];
        for (dst, cell) in out.iter_mut().zip(self.cells.iter()) {
            *dst = cell.map_or(0, Stone::code);
        }
        out
    }

    /// CRC32 over the cell codes; cheap equality check for remote snapshots.
    pub fn fingerprint(&self) -> u32 {
        crc32fast::hash(&self.to_array())
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn in_bounds(row: i32, col: i32) -> bool {
    (0..BOARD_SIZE as i32).contains(&row) && (0..BOARD_SIZE as i32).contains(&col)
}

fn index_to_pos(idx: usize) -> Position {
    Position::new((idx / BOARD_SIZE) as u8, (idx % BOARD_SIZE) as u8)
}
