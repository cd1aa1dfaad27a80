use std::fmt;

use serde::{Deserialize, Serialize};

/// Content of an occupied grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "color", rename_all = "camelCase")]
pub enum Tile {
    /// Plain tile; index into the configured palette.
    Color(u8),
    /// Cross bomb: clears its whole row and column.
    Bomb,
    RowBomb,
    ColBomb,
    /// Clears every tile of a chosen color.
    Rainbow,
}

impl Tile {
    pub fn is_plain(self) -> bool {
        matches!(self, Tile::Color(_))
    }

    pub fn is_special(self) -> bool {
        !self.is_plain()
    }

    /// Specials that go off when swapped.
    pub fn detonates_on_swap(self) -> bool {
        matches!(self, Tile::Bomb | Tile::RowBomb | Tile::ColBomb)
    }

    pub fn color(self) -> Option<u8> {
        match self {
            Tile::Color(c) => Some(c),
            _ => None,
        }
    }
}

/// Limited-use helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Tool {
    CleanOne,
    ForcedSwap,
    Shuffle,
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tool::CleanOne => "clean-one",
            Tool::ForcedSwap => "forced-swap",
            Tool::Shuffle => "shuffle",
        };
        f.write_str(name)
    }
}
