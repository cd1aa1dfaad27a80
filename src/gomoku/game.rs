use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::GomokuError;
use crate::gomoku::ai::{Difficulty, MoveSelector};
use crate::gomoku::board::{Board, Stone, BOARD_SIZE};
use crate::gomoku::rules::{check_win, winning_line};
use crate::types::{GomokuState, Position};

/// Local game against the AI. The human plays black and always moves first.
pub struct GomokuGame {
    board: Board,
    pub current_player: Stone,
    pub is_game_over: bool,
    winner: Option<Stone>,
    last_move: Option<Position>,
    difficulty: Difficulty,
    ai_color: Stone,
    selector: Box<dyn MoveSelector>,
    rng: StdRng,
}

impl GomokuGame {
    pub fn new(difficulty: Difficulty, seed: u64) -> Self {
        Self::with_selector(difficulty, difficulty.selector(), seed)
    }

    pub fn with_selector(
        difficulty: Difficulty,
        selector: Box<dyn MoveSelector>,
        seed: u64,
    ) -> Self {
        Self {
            board: Board::new(),
            current_player: Stone::Black,
            is_game_over: false,
            winner: None,
            last_move: None,
            difficulty,
            ai_color: Stone::White,
            selector,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.difficulty = difficulty;
        self.selector = difficulty.selector();
    }

    pub fn ai_color(&self) -> Stone {
        self.ai_color
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn cell(&self, row: u8, col: u8) -> Option<Stone> {
        self.board.get(row as usize, col as usize)
    }

    pub fn winner(&self) -> Option<Stone> {
        self.winner
    }

    /// Human placement.
    pub fn place(&mut self, row: u8, col: u8) -> Result<(), GomokuError> {
        if self.current_player == self.ai_color && !self.is_game_over {
            return Err(GomokuError::NotYourTurn);
        }
        self.apply_move(row, col, self.ai_color.opponent())
    }

    /// Places a stone for `player`, then either ends the game or passes the turn.
    pub fn apply_move(&mut self, row: u8, col: u8, player: Stone) -> Result<(), GomokuError> {
        if self.is_game_over {
            return Err(GomokuError::GameOver);
        }
        if self.current_player != player {
            return Err(GomokuError::NotYourTurn);
        }
        let (r, c) = row_col_to_index(row, col)?;
        if !self.board.place(r, c, player) {
            return Err(GomokuError::Occupied { row, col });
        }

        self.last_move = Some(Position::new(row, col));

        if check_win(&self.board, r, c, player) {
            info!("gomoku: {player:?} wins at ({row}, {col})");
            self.winner = Some(player);
            self.end_game();
        } else if self.board.is_full() {
            info!("gomoku: board full, draw");
            self.end_game();
        } else {
            self.current_player = player.opponent();
        }

        Ok(())
    }

    pub fn do_ai_move(&mut self) -> Result<Position, GomokuError> {
        if self.is_game_over {
            return Err(GomokuError::GameOver);
        }
        if self.current_player != self.ai_color {
            return Err(GomokuError::NotYourTurn);
        }

        let selected = self
            .selector
            .select_move(&self.board, self.ai_color, &mut self.rng);
        debug!("gomoku: ai ({:?}) selected ({}, {})", self.difficulty, selected.row, selected.col);

        self.apply_move(selected.row, selected.col, self.ai_color)?;
        Ok(selected)
    }

    pub fn end_game(&mut self) {
        self.is_game_over = true;
    }

    /// Clears the board; black to move.
    pub fn reset(&mut self) {
        self.board = Board::new();
        self.current_player = Stone::Black;
        self.is_game_over = false;
        self.winner = None;
        self.last_move = None;
    }

    /// Replaces the local view with an authoritative remote snapshot.
    pub fn load(
        &mut self,
        board: Board,
        current_player: Stone,
        is_game_over: bool,
        winner: Option<Stone>,
        last_move: Option<Position>,
    ) {
        self.board = board;
        self.current_player = current_player;
        self.is_game_over = is_game_over;
        self.winner = winner;
        self.last_move = last_move;
    }

    pub fn to_game_state(&self) -> GomokuState {
        let winning_line = match (self.winner, self.last_move) {
            (Some(player), Some(pos)) => {
                winning_line(&self.board, pos.row as usize, pos.col as usize, player)
                    .unwrap_or_default()
            }
            _ => Vec::new(),
        };

        GomokuState {
            board: self.board.to_vec(),
            current_player: self.current_player,
            is_game_over: self.is_game_over,
            winner: self.winner,
            last_move: self.last_move,
            winning_line,
        }
    }

    #[cfg(test)]
    fn set_board_for_test(&mut self, board: Board, current_player: Stone) {
        self.board = board;
        self.current_player = current_player;
        self.is_game_over = false;
        self.winner = None;
    }
}

fn row_col_to_index(row: u8, col: u8) -> Result<(usize, usize), GomokuError> {
    if row as usize >= BOARD_SIZE || col as usize >= BOARD_SIZE {
        return Err(GomokuError::OutOfBounds { row, col });
    }
    Ok((row as usize, col as usize))
}
