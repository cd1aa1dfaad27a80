use thiserror::Error;

use crate::crush::tile::Tool;
use crate::sync::room::Role;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GomokuError {
    #[error("game is already over")]
    GameOver,
    #[error("it is not this player's turn")]
    NotYourTurn,
    #[error("cell ({row}, {col}) is already occupied")]
    Occupied { row: u8, col: u8 },
    #[error("row/col out of range: ({row}, {col})")]
    OutOfBounds { row: u8, col: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrushError {
    #[error("a turn is still resolving")]
    Busy,
    #[error("tiles are not adjacent")]
    NotAdjacent,
    #[error("row/col out of range: ({row}, {col})")]
    OutOfBounds { row: u8, col: u8 },
    #[error("no {0} uses remaining")]
    ToolExhausted(Tool),
    #[error("rainbow activation needs a rainbow and a plain tile")]
    NotRainbowPair,
    #[error("no resolution pass is pending")]
    NothingToStep,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("room {0} does not exist")]
    RoomNotFound(String),
    #[error("room already exists: {0}")]
    RoomExists(String),
    #[error("transaction rejected: {0}")]
    Rejected(String),
    #[error("{0} slot is taken")]
    SlotTaken(Role),
    #[error("client does not hold a player slot")]
    NotAPlayer,
    #[error("room service unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unsupported grid size {0} (expected 4, 8, 10 or 12)")]
    GridSize(u8),
    #[error("palette size {0} out of range (3..=8)")]
    PaletteSize(u8),
}
