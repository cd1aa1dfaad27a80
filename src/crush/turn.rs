use std::collections::BTreeMap;

use serde::Serialize;

use crate::crush::tile::Tile;
use crate::types::Position;

/// Bookkeeping for one player action, from input until the grid is stable again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TurnContext {
    /// Player-initiated passes in this action. Cascades never count.
    pub combo: u32,
    pub cleared: u32,
    pub bombs_spawned: u32,
    pub rainbows_spawned: u32,
    /// Set by a direct swap; cleared once a detonation takes over the turn.
    pub player_initiated: bool,
}

impl TurnContext {
    pub fn begin(&mut self, player_initiated: bool) {
        *self = Self {
            player_initiated,
            ..Self::default()
        };
    }

    pub fn finish(&mut self) {
        *self = Self::default();
    }

    pub fn combo_multiplier(&self) -> u32 {
        match self.combo {
            0 | 1 => 1,
            2 => 2,
            3 => 3,
            _ => 4,
        }
    }

    /// Applies the per-turn caps to a spawn candidate and records it when allowed.
    pub fn allow_spawn(&mut self, tile: Tile, max_bombs: u32, max_rainbows: u32) -> bool {
        match tile {
            Tile::Rainbow if self.rainbows_spawned < max_rainbows => {
                self.rainbows_spawned += 1;
                true
            }
            Tile::Bomb | Tile::RowBomb | Tile::ColBomb if self.bombs_spawned < max_bombs => {
                self.bombs_spawned += 1;
                true
            }
            _ => false,
        }
    }
}

/// Special tile earned by a match set: five or more tiles make a rainbow, four sharing a row
/// make a row bomb, four sharing a column make a column bomb.
pub fn special_for_match(matches: &[Position]) -> Option<Tile> {
    if matches.len() >= 5 {
        return Some(Tile::Rainbow);
    }

    let mut rows: BTreeMap<u8, usize> = BTreeMap::new();
    let mut cols: BTreeMap<u8, usize> = BTreeMap::new();
    for pos in matches {
        *rows.entry(pos.row).or_default() += 1;
        *cols.entry(pos.col).or_default() += 1;
    }

    if rows.values().any(|&n| n >= 4) {
        Some(Tile::RowBomb)
    } else if cols.values().any(|&n| n >= 4) {
        Some(Tile::ColBomb)
    } else {
        None
    }
}
