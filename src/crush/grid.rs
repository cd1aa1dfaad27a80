use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::crush::tile::Tile;
use crate::types::Position;

const MIN_RUN: usize = 3;

/// Square Match-3 grid, row-major. Row 0 is the top; gravity pulls towards the last row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    size: usize,
    palette: u8,
    cells: Vec<Option<Tile>>,
}

impl Grid {
    /// Random grid with no pre-existing runs.
    pub fn generate(size: usize, palette: u8, rng: &mut StdRng) -> Self {
        let mut grid = Self {
            size,
            palette,
            cells: vec![None; size * size],
        };

        for row in 0..size {
            for col in 0..size {
                let left = (col >= 2)
                    .then(|| grid.pair_color(Position::new(row as u8, col as u8 - 1), 0, 1))
                    .flatten();
                let up = (row >= 2)
                    .then(|| grid.pair_color(Position::new(row as u8 - 1, col as u8), 1, 0))
                    .flatten();

                let color = loop {
                    let candidate = rng.gen_range(0..palette);
                    if Some(candidate) != left && Some(candidate) != up {
                        break candidate;
                    }
                };
                grid.cells[row * size + col] = Some(Tile::Color(color));
            }
        }

        grid
    }

    /// Builds a grid from explicit rows. Returns `None` unless the rows form a square.
    pub fn from_rows(rows: Vec<Vec<Option<Tile>>>, palette: u8) -> Option<Self> {
        let size = rows.len();
        if rows.iter().any(|row| row.len() != size) {
            return None;
        }
        Some(Self {
            size,
            palette,
            cells: rows.into_iter().flatten().collect(),
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn palette(&self) -> u8 {
        self.palette
    }

    pub fn contains(&self, pos: Position) -> bool {
        (pos.row as usize) < self.size && (pos.col as usize) < self.size
    }

    pub fn get(&self, pos: Position) -> Option<Tile> {
        if self.contains(pos) {
            self.cells[self.index(pos)]
        } else {
            None
        }
    }

    pub fn set(&mut self, pos: Position, tile: Option<Tile>) {
        if self.contains(pos) {
            let idx = self.index(pos);
            self.cells[idx] = tile;
        }
    }

    pub fn swap(&mut self, a: Position, b: Position) {
        if self.contains(a) && self.contains(b) {
            let (ia, ib) = (self.index(a), self.index(b));
            self.cells.swap(ia, ib);
        }
    }

    pub fn cells(&self) -> &[Option<Tile>] {
        &self.cells
    }

    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.size * self.size).map(|idx| self.position(idx))
    }

    pub fn empty_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_none()).count()
    }

    pub fn random_tile(&self, rng: &mut StdRng) -> Tile {
        Tile::Color(rng.gen_range(0..self.palette))
    }

    /// Every cell in a horizontal or vertical run of three or more identical plain tiles.
    /// Whole runs are returned, not only their first three cells.
    pub fn find_matches(&self) -> Vec<Position> {
        let mut matched = BTreeSet::new();

        for row in 0..self.size {
            self.collect_runs((0..self.size).map(|col| (row, col)), &mut matched);
        }
        for col in 0..self.size {
            self.collect_runs((0..self.size).map(|row| (row, col)), &mut matched);
        }

        matched.into_iter().collect()
    }

    fn collect_runs(
        &self,
        line: impl Iterator<Item = (usize, usize)>,
        out: &mut BTreeSet<Position>,
    ) {
        let mut run: Vec<Position> = Vec::new();
        let mut run_color: Option<u8> = None;

        for (row, col) in line {
            let pos = Position::new(row as u8, col as u8);
            let color = self.get(pos).and_then(Tile::color);

            if color.is_some() && color == run_color {
                run.push(pos);
                continue;
            }
            if run.len() >= MIN_RUN {
                out.extend(run.iter().copied());
            }
            run.clear();
            run.push(pos);
            run_color = color;
        }

        if run.len() >= MIN_RUN && run_color.is_some() {
            out.extend(run);
        }
    }

    /// Compacts each column downwards, preserving order, and refills the top with plain tiles.
    /// Returns every cell whose content changed.
    pub fn apply_gravity(&mut self, rng: &mut StdRng) -> Vec<Position> {
        let mut changed = Vec::new();

        for col in 0..self.size {
            let column: Vec<Tile> = (0..self.size)
                .rev()
                .filter_map(|row| self.cells[row * self.size + col])
                .collect();

            for (depth, row) in (0..self.size).rev().enumerate() {
                let next = match column.get(depth) {
                    Some(&tile) => tile,
                    None => self.random_tile(rng),
                };
                let idx = row * self.size + col;
                if self.cells[idx] != Some(next) {
                    changed.push(Position::new(row as u8, col as u8));
                }
                self.cells[idx] = Some(next);
            }
        }

        changed
    }

    /// True when some adjacent swap forms a run, or a special tile is on the grid
    /// (specials always act when swapped).
    pub fn has_legal_move(&self) -> bool {
        if self.cells.iter().flatten().any(|tile| tile.is_special()) {
            return true;
        }

        let mut probe = self.clone();
        for pos in self.positions() {
            for next in [
                Position::new(pos.row, pos.col + 1),
                Position::new(pos.row + 1, pos.col),
            ] {
                if !self.contains(next) {
                    continue;
                }
                probe.swap(pos, next);
                let found = probe.forms_run_at(pos) || probe.forms_run_at(next);
                probe.swap(pos, next);
                if found {
                    return true;
                }
            }
        }

        false
    }

    /// Randomly permutes every tile; empty cells are refilled first.
    pub fn shuffle(&mut self, rng: &mut StdRng) {
        for idx in 0..self.cells.len() {
            if self.cells[idx].is_none() {
                self.cells[idx] = Some(self.random_tile(rng));
            }
        }
        self.cells.shuffle(rng);
    }

    fn forms_run_at(&self, pos: Position) -> bool {
        let Some(color) = self.get(pos).and_then(Tile::color) else {
            return false;
        };
        [(0i32, 1i32), (1, 0)].iter().any(|&(dr, dc)| {
            let run = 1
                + self.same_color_len(pos, dr, dc, color)
                + self.same_color_len(pos, -dr, -dc, color);
            run >= MIN_RUN
        })
    }

    fn same_color_len(&self, pos: Position, dr: i32, dc: i32, color: u8) -> usize {
        let mut count = 0;
        let mut r = pos.row as i32 + dr;
        let mut c = pos.col as i32 + dc;
        while r >= 0
            && c >= 0
            && self.get(Position::new(r as u8, c as u8)).and_then(Tile::color) == Some(color)
        {
            count += 1;
            r += dr;
            c += dc;
        }
        count
    }

    /// Color shared by `pos` and the cell one step further back, if any.
    fn pair_color(&self, pos: Position, dr: u8, dc: u8) -> Option<u8> {
        let prev = Position::new(pos.row - dr, pos.col - dc);
        let a = self.get(pos).and_then(Tile::color)?;
        let b = self.get(prev).and_then(Tile::color)?;
        (a == b).then_some(a)
    }

    fn index(&self, pos: Position) -> usize {
        pos.row as usize * self.size + pos.col as usize
    }

    fn position(&self, idx: usize) -> Position {
        Position::new((idx / self.size) as u8, (idx % self.size) as u8)
    }
}
