//! Line-threat evaluation for a single candidate cell.
//!
//! A virtual stone is placed on the candidate cell and each of the four lines through it is
//! scored by the length of the resulting run and how many of its ends stay open.

use crate::gomoku::board::{in_bounds, Board, Stone};
use crate::gomoku::rules::DIRECTIONS;

pub const FIVE: u32 = 1_000_000;
pub const LIVE_FOUR: u32 = 100_000;
pub const DEAD_FOUR: u32 = 10_000;
pub const LIVE_THREE: u32 = 5_000;
pub const DEAD_THREE: u32 = 100;
pub const LIVE_TWO: u32 = 50;
pub const DEAD_TWO: u32 = 5;
pub const LIVE_ONE: u32 = 5;
pub const DEAD_ONE: u32 = 1;

/// Run through the candidate cell along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineShape {
    /// Includes the virtual stone.
    pub run_length: usize,
    /// 0, 1 or 2.
    pub open_ends: u8,
}

/// Scores placing `player` on the empty cell `(row, col)`: the sum of the four line scores.
pub fn evaluate_cell(board: &Board, row: usize, col: usize, player: Stone) -> u32 {
    DIRECTIONS
        .iter()
        .map(|&(dr, dc)| {
            let shape = analyze_line(board, row, col, dr, dc, player);
            line_score(shape.run_length, shape.open_ends)
        })
        .sum()
}

pub fn analyze_line(
    board: &Board,
    row: usize,
    col: usize,
    dr: i32,
    dc: i32,
    player: Stone,
) -> LineShape {
    let (forward, forward_open) = walk(board, row, col, dr, dc, player);
    let (backward, backward_open) = walk(board, row, col, -dr, -dc, player);

    LineShape {
        run_length: 1 + forward + backward,
        open_ends: u8::from(forward_open) + u8::from(backward_open),
    }
}

/// Counts contiguous `player` stones; the walk stops at the edge, an opponent stone,
/// or the first empty cell, which counts as an open end.
fn walk(board: &Board, row: usize, col: usize, dr: i32, dc: i32, player: Stone) -> (usize, bool) {
    let mut count = 0;
    let mut r = row as i32 + dr;
    let mut c = col as i32 + dc;

    while in_bounds(r, c) {
        match board.get(r as usize, c as usize) {
            Some(stone) if stone == player => count += 1,
            None => return (count, true),
            Some(_) => break,
        }
        r += dr;
        c += dc;
    }

    (count, false)
}

pub fn line_score(run_length: usize, open_ends: u8) -> u32 {
    if run_length >= 5 {
        return FIVE;
    }
    if open_ends == 0 {
        return 0;
    }

    match (run_length, open_ends >= 2) {
        (4, true) => LIVE_FOUR,
        (4, false) => DEAD_FOUR,
        (3, true) => LIVE_THREE,
        (3, false) => DEAD_THREE,
        (2, true) => LIVE_TWO,
        (2, false) => DEAD_TWO,
        (_, true) => LIVE_ONE,
        (_, false) => DEAD_ONE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_with(stones: &[(usize, usize, Stone)]) -> Board {
        let mut board = Board::new();
        for &(r, c, s) in stones {
            assert!(board.place(r, c, s));
        }
        board
    }

    #[test]
    fn score_table_matches_run_and_open_ends() {
        assert_eq!(line_score(5, 0), FIVE);
        assert_eq!(line_score(6, 1), FIVE);
        assert_eq!(line_score(4, 2), LIVE_FOUR);
        assert_eq!(line_score(4, 1), DEAD_FOUR);
        assert_eq!(line_score(4, 0), 0);
        assert_eq!(line_score(3, 2), LIVE_THREE);
        assert_eq!(line_score(3, 1), DEAD_THREE);
        assert_eq!(line_score(2, 2), LIVE_TWO);
        assert_eq!(line_score(2, 1), DEAD_TWO);
        assert_eq!(line_score(1, 2), LIVE_ONE);
        assert_eq!(line_score(1, 1), DEAD_ONE);
        assert_eq!(line_score(1, 0), 0);
    }

    #[test]
    fn isolated_cell_scores_live_one_in_every_direction() {
        let board = Board::new();

        assert_eq!(evaluate_cell(&board, 7, 7, Stone::Black), 4 * LIVE_ONE);
    }

    #[test]
    fn corner_cell_has_one_open_end_per_direction() {
        let board = Board::new();

        // Anti-diagonal from (0, 0) runs off the board both ways.
        assert_eq!(evaluate_cell(&board, 0, 0, Stone::Black), 3 * DEAD_ONE);
    }

    #[test]
    fn completing_an_open_four_guarantees_live_four_score() {
        let board = board_with(&[(7, 5, Stone::White), (7, 6, Stone::White), (7, 7, Stone::White)]);

        let shape = analyze_line(&board, 7, 8, 0, 1, Stone::White);

        assert_eq!(shape, LineShape { run_length: 4, open_ends: 2 });
        assert!(evaluate_cell(&board, 7, 8, Stone::White) >= LIVE_FOUR);
        assert!(evaluate_cell(&board, 7, 4, Stone::White) >= LIVE_FOUR);
    }

    #[test]
    fn gap_filling_joins_both_sides() {
        let board = board_with(&[
            (3, 3, Stone::Black),
            (3, 4, Stone::Black),
            (3, 6, Stone::Black),
            (3, 7, Stone::Black),
        ]);

        assert!(evaluate_cell(&board, 3, 5, Stone::Black) >= FIVE);
    }

    #[test]
    fn blocked_run_is_worthless() {
        let board = board_with(&[
            (0, 0, Stone::White),
            (0, 1, Stone::Black),
            (0, 2, Stone::Black),
            (0, 4, Stone::White),
        ]);

        let shape = analyze_line(&board, 0, 3, 0, 1, Stone::Black);

        assert_eq!(shape, LineShape { run_length: 3, open_ends: 0 });
        assert_eq!(line_score(shape.run_length, shape.open_ends), 0);
    }

    #[test]
    fn opponent_view_sees_the_threat() {
        let board = board_with(&[
            (2, 2, Stone::Black),
            (3, 3, Stone::Black),
            (4, 4, Stone::Black),
            (5, 5, Stone::Black),
            (1, 1, Stone::White),
        ]);

        // Dead four for black: blocking it is worth at least DEAD_FOUR to white's defense.
        assert!(evaluate_cell(&board, 6, 6, Stone::Black) >= DEAD_FOUR);
        assert!(evaluate_cell(&board, 6, 6, Stone::White) < DEAD_THREE);
    }
}
