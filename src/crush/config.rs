use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const GRID_SIZES: [u8; 4] = [4, 8, 10, 12];

/// Board presets offered by the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrushMode {
    Mini,
    Classic,
    Large,
    Huge,
}

impl CrushMode {
    pub fn grid_size(self) -> u8 {
        match self {
            CrushMode::Mini => 4,
            CrushMode::Classic => 8,
            CrushMode::Large => 10,
            CrushMode::Huge => 12,
        }
    }
}

/// Points awarded per cleared tile, by cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScoreTable {
    pub match_tile: u32,
    pub cross_bomb_tile: u32,
    pub line_bomb_tile: u32,
    pub rainbow_tile: u32,
    /// Flat award for the clean-one tool.
    pub clean_one: u32,
}

impl Default for ScoreTable {
    fn default() -> Self {
        Self {
            match_tile: 10,
            cross_bomb_tile: 20,
            line_bomb_tile: 25,
            rainbow_tile: 30,
            clean_one: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CrushConfig {
    pub grid_size: u8,
    pub palette_size: u8,
    /// Tool budgets per game; 0 disables the tool.
    pub clean_one: u32,
    pub forced_swap: u32,
    pub shuffles: u32,
    pub max_bombs_per_turn: u32,
    pub max_rainbows_per_turn: u32,
    /// Tiles cleared in one player turn that earn a bonus bomb.
    pub bomb_reward_threshold: u32,
    pub shuffle_attempts: u32,
    pub scores: ScoreTable,
}

impl Default for CrushConfig {
    fn default() -> Self {
        Self {
            grid_size: CrushMode::Classic.grid_size(),
            palette_size: 5,
            clean_one: 3,
            forced_swap: 3,
            shuffles: 3,
            max_bombs_per_turn: 2,
            max_rainbows_per_turn: 1,
            bomb_reward_threshold: 6,
            shuffle_attempts: 10,
            scores: ScoreTable::default(),
        }
    }
}

impl CrushConfig {
    pub fn for_mode(mode: CrushMode) -> Self {
        Self {
            grid_size: mode.grid_size(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !GRID_SIZES.contains(&self.grid_size) {
            return Err(ConfigError::GridSize(self.grid_size));
        }
        if !(3..=8).contains(&self.palette_size) {
            return Err(ConfigError::PaletteSize(self.palette_size));
        }
        Ok(())
    }
}
