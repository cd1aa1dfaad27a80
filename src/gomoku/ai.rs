use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::gomoku::board::{Board, Stone, CENTER};
use crate::gomoku::eval::{evaluate_cell, DEAD_FOUR};
use crate::types::Position;

/// Defense score at or above which Medium stops exploring and blocks.
const MEDIUM_MUST_BLOCK: u32 = 2_000;
const MEDIUM_POOL_SIZE: usize = 4;

pub trait MoveSelector: Send + Sync {
    /// Picks a cell for `ai`. Falls back to the center when the board is full.
    fn select_move(&self, board: &Board, ai: Stone, rng: &mut StdRng) -> Position;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    #[default]
    Hard,
}

impl Difficulty {
    /// Parses the UI label; anything unknown plays at full strength.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "easy" => Difficulty::Easy,
            "medium" => Difficulty::Medium,
            _ => Difficulty::Hard,
        }
    }

    pub fn selector(self) -> Box<dyn MoveSelector> {
        match self {
            Difficulty::Easy => Box::new(EasySelector),
            Difficulty::Medium => Box::new(MediumSelector),
            Difficulty::Hard => Box::new(HardSelector),
        }
    }
}

/// Blocks an opponent four, otherwise plays anywhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct EasySelector;

impl MoveSelector for EasySelector {
    fn select_move(&self, board: &Board, ai: Stone, rng: &mut StdRng) -> Position {
        let human = ai.opponent();
        let mut candidates = Vec::new();

        for pos in board.empty_cells() {
            if evaluate_cell(board, pos.row as usize, pos.col as usize, human) >= DEAD_FOUR {
                debug!("easy: blocking four at ({}, {})", pos.row, pos.col);
                return pos;
            }
            candidates.push(pos);
        }

        candidates.choose(rng).copied().unwrap_or(CENTER)
    }
}

/// Blocks live threes and fours; otherwise picks among the few best cells.
#[derive(Debug, Default, Clone, Copy)]
pub struct MediumSelector;

impl MoveSelector for MediumSelector {
    fn select_move(&self, board: &Board, ai: Stone, rng: &mut StdRng) -> Position {
        let mut all_moves: Vec<(Position, i64)> = Vec::new();
        let mut must_block: Option<(Position, u32)> = None;

        for pos in board.empty_cells() {
            let (attack, defense) = attack_defense(board, pos, ai);

            if defense >= MEDIUM_MUST_BLOCK && must_block.is_none_or(|(_, best)| defense > best) {
                must_block = Some((pos, defense));
            }

            all_moves.push((pos, combined_score(pos, attack, defense)));
        }

        if let Some((pos, defense)) = must_block {
            debug!("medium: must block at ({}, {}) defense={defense}", pos.row, pos.col);
            return pos;
        }

        // Stable sort keeps scan order among equal scores.
        all_moves.sort_by(|(_, left), (_, right)| right.cmp(left));
        let pool = &all_moves[..all_moves.len().min(MEDIUM_POOL_SIZE)];

        pool.choose(rng).map_or(CENTER, |(pos, _)| *pos)
    }
}

/// Uniform choice among every cell tying the best combined score.
#[derive(Debug, Default, Clone, Copy)]
pub struct HardSelector;

impl MoveSelector for HardSelector {
    fn select_move(&self, board: &Board, ai: Stone, rng: &mut StdRng) -> Position {
        let mut best_score = i64::MIN;
        let mut best_moves: Vec<Position> = Vec::new();

        for pos in board.empty_cells() {
            let (attack, defense) = attack_defense(board, pos, ai);
            let score = combined_score(pos, attack, defense);

            if score > best_score {
                best_score = score;
                best_moves.clear();
                best_moves.push(pos);
            } else if score == best_score {
                best_moves.push(pos);
            }
        }

        debug!("hard: {} candidates at score {best_score}", best_moves.len());
        best_moves.choose(rng).copied().unwrap_or(CENTER)
    }
}

fn attack_defense(board: &Board, pos: Position, ai: Stone) -> (u32, u32) {
    let (row, col) = (pos.row as usize, pos.col as usize);
    (
        evaluate_cell(board, row, col, ai),
        evaluate_cell(board, row, col, ai.opponent()),
    )
}

/// Attack + defense minus Manhattan distance from the center.
pub fn combined_score(pos: Position, attack: u32, defense: u32) -> i64 {
    i64::from(attack) + i64::from(defense) - i64::from(center_distance(pos))
}

pub fn center_distance(pos: Position) -> u32 {
    u32::from(pos.row.abs_diff(CENTER.row)) + u32::from(pos.col.abs_diff(CENTER.col))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn board_with(stones: &[(usize, usize, Stone)]) -> Board {
        let mut board = Board::new();
        for &(r, c, s) in stones {
            assert!(board.place(r, c, s));
        }
        board
    }

    fn full_board() -> Board {
        let mut board = Board::new();
        for pos in Board::new().empty_cells() {
            let stone = if (pos.row + pos.col) % 2 == 0 { Stone::Black } else { Stone::White };
            board.place(pos.row as usize, pos.col as usize, stone);
        }
        board
    }

    #[test]
    fn difficulty_labels_parse_with_hard_fallback() {
        assert_eq!(Difficulty::from_label("easy"), Difficulty::Easy);
        assert_eq!(Difficulty::from_label(" Medium "), Difficulty::Medium);
        assert_eq!(Difficulty::from_label("hard"), Difficulty::Hard);
        assert_eq!(Difficulty::from_label("nightmare"), Difficulty::Hard);
    }

    #[test]
    fn hard_answers_center_opening_next_to_it() {
        let board = board_with(&[(7, 7, Stone::Black)]);

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mv = HardSelector.select_move(&board, Stone::White, &mut rng);

            assert!(board.is_empty_at(mv.row as usize, mv.col as usize));
            assert!(mv.row.abs_diff(7) <= 1 && mv.col.abs_diff(7) <= 1, "got {mv:?}");
        }
    }

    #[test]
    fn hard_takes_the_winning_cell() {
        let board = board_with(&[
            (0, 0, Stone::White),
            (0, 1, Stone::White),
            (0, 2, Stone::White),
            (0, 3, Stone::White),
            (7, 7, Stone::Black),
            (7, 8, Stone::Black),
            (7, 9, Stone::Black),
        ]);
        let mut rng = StdRng::seed_from_u64(1);

        assert_eq!(
            HardSelector.select_move(&board, Stone::White, &mut rng),
            Position::new(0, 4)
        );
    }

    #[test]
    fn easy_blocks_a_dead_four() {
        let board = board_with(&[
            (10, 2, Stone::White),
            (10, 3, Stone::Black),
            (10, 4, Stone::Black),
            (10, 5, Stone::Black),
            (10, 6, Stone::Black),
        ]);

        for seed in 0..5 {
            let mut rng = StdRng::seed_from_u64(seed);
            assert_eq!(
                EasySelector.select_move(&board, Stone::White, &mut rng),
                Position::new(10, 7)
            );
        }
    }

    #[test]
    fn easy_without_threat_plays_an_empty_cell() {
        let board = board_with(&[(7, 7, Stone::Black)]);
        let mut rng = StdRng::seed_from_u64(9);

        let mv = EasySelector.select_move(&board, Stone::White, &mut rng);

        assert!(board.is_empty_at(mv.row as usize, mv.col as usize));
    }

    #[test]
    fn medium_blocks_an_open_three() {
        let board = board_with(&[
            (4, 4, Stone::Black),
            (4, 5, Stone::Black),
            (4, 6, Stone::Black),
            (9, 9, Stone::White),
        ]);

        for seed in 0..5 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mv = MediumSelector.select_move(&board, Stone::White, &mut rng);
            // Both ends make a live four for black; the scan meets (4, 3) first.
            assert_eq!(mv, Position::new(4, 3));
        }
    }

    #[test]
    fn medium_picks_from_top_four_without_threats() {
        let board = board_with(&[(7, 7, Stone::Black)]);
        let mut scored: Vec<(Position, i64)> = board
            .empty_cells()
            .map(|pos| {
                let (a, d) = attack_defense(&board, pos, Stone::White);
                (pos, combined_score(pos, a, d))
            })
            .collect();
        scored.sort_by(|(_, l), (_, r)| r.cmp(l));
        let top: Vec<Position> = scored.iter().take(4).map(|(p, _)| *p).collect();

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mv = MediumSelector.select_move(&board, Stone::White, &mut rng);
            assert!(top.contains(&mv), "{mv:?} not in {top:?}");
        }
    }

    #[test]
    fn full_board_falls_back_to_center() {
        let board = full_board();
        let mut rng = StdRng::seed_from_u64(0);

        assert_eq!(EasySelector.select_move(&board, Stone::White, &mut rng), CENTER);
        assert_eq!(MediumSelector.select_move(&board, Stone::White, &mut rng), CENTER);
        assert_eq!(HardSelector.select_move(&board, Stone::White, &mut rng), CENTER);
    }

    #[test]
    fn center_distance_is_manhattan() {
        assert_eq!(center_distance(CENTER), 0);
        assert_eq!(center_distance(Position::new(0, 0)), 14);
        assert_eq!(center_distance(Position::new(8, 5)), 3);
    }
}
