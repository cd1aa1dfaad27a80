use crate::gomoku::board::{in_bounds, Board, Stone};
use crate::types::Position;

/// Horizontal, vertical, and the two diagonals.
pub const DIRECTIONS: [(i32, i32); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

const WIN_LENGTH: usize = 5;

/// Counts same-colour stones strictly beyond `(row, col)` along `(dr, dc)`.
pub fn count_direction(
    board: &Board,
    row: usize,
    col: usize,
    dr: i32,
    dc: i32,
    player: Stone,
) -> usize {
    let mut count = 0;
    let mut r = row as i32 + dr;
    let mut c = col as i32 + dc;

    while in_bounds(r, c) && board.get(r as usize, c as usize) == Some(player) {
        count += 1;
        r += dr;
        c += dc;
    }

    count
}

/// True when a stone of `player` at `(row, col)` completes five or more in a row.
///
/// The cell itself is counted as the player's stone whether or not it is set on `board`,
/// so callers can validate a proposed move against any hypothetical board before committing it.
pub fn check_win(board: &Board, row: usize, col: usize, player: Stone) -> bool {
    DIRECTIONS.iter().any(|&(dr, dc)| {
        1 + count_direction(board, row, col, dr, dc, player)
            + count_direction(board, row, col, -dr, -dc, player)
            >= WIN_LENGTH
    })
}

/// Cells of the first completed run through `(row, col)`, ordered along the line.
pub fn winning_line(board: &Board, row: usize, col: usize, player: Stone) -> Option<Vec<Position>> {
    for (dr, dc) in DIRECTIONS {
        let back = count_direction(board, row, col, -dr, -dc, player) as i32;
        let forward = count_direction(board, row, col, dr, dc, player) as i32;
        if (1 + back + forward) as usize >= WIN_LENGTH {
            let line = (-back..=forward)
                .map(|i| {
                    Position::new(
                        (row as i32 + i * dr) as u8,
                        (col as i32 + i * dc) as u8,
                    )
                })
                .collect();
            return Some(line);
        }
    }
    None
}
