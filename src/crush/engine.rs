//! Match-3 turn engine.
//!
//! A player action moves the engine from `Idle` through `Swapping` into `Resolving`, where each
//! call to [`CrushEngine::step`] performs one resolution pass: clear, score, gravity, re-scan.
//! The pass that leaves the grid stable finalizes the turn and returns the engine to `Idle`.
//! Callers that animate can step manually; everyone else uses the methods that run to `Idle`.

use std::collections::BTreeSet;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

use crate::crush::config::CrushConfig;
use crate::crush::grid::Grid;
use crate::crush::tile::{Tile, Tool};
use crate::crush::turn::{special_for_match, TurnContext};
use crate::error::{ConfigError, CrushError};
use crate::types::{GridSnapshot, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Idle,
    Swapping,
    Resolving,
}

/// What a swap request turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SwapOutcome {
    /// No match; the tiles went back.
    Reverted,
    /// A forced swap without a match; the grid change stands.
    Committed,
    Matched,
    Detonated,
    Rainbow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StepKind {
    Match,
    CrossBomb,
    RowBomb,
    ColBomb,
    Rainbow,
    CleanOne,
}

/// One resolution pass, reported for animation and testing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionStep {
    pub kind: StepKind,
    pub cleared: Vec<Position>,
    pub points: u64,
    pub multiplier: u32,
    pub spawned: Option<(Position, Tile)>,
    /// Cells changed by gravity and refill.
    pub moved: Vec<Position>,
    /// Set on the pass that settled the turn.
    pub settled: bool,
    pub bonus_bomb: Option<Position>,
}

/// Payload handed to `on_cells_changed` listeners. `tiles` holds the new contents of `cells`,
/// so a listener can redraw without reading the engine back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellsChanged {
    pub cells: Vec<Position>,
    pub tiles: Vec<(Position, Option<Tile>)>,
    pub score: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pending {
    Match {
        cells: Vec<Position>,
        player_initiated: bool,
    },
    Clear {
        kind: StepKind,
        cells: Vec<Position>,
        points: u64,
    },
}

type Listener = Box<dyn FnMut(&CellsChanged)>;

pub struct CrushEngine {
    config: CrushConfig,
    grid: Grid,
    rng: StdRng,
    score: u64,
    phase: Phase,
    turn: TurnContext,
    pending: Option<Pending>,
    clean_one_remaining: u32,
    forced_swap_remaining: u32,
    shuffle_remaining: u32,
    last_turn: Vec<ResolutionStep>,
    listeners: Vec<Listener>,
}

impl CrushEngine {
    pub fn new(config: CrushConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = StdRng::seed_from_u64(seed);
        let grid = Grid::generate(config.grid_size as usize, config.palette_size, &mut rng);
        Ok(Self::assemble(config, grid, rng))
    }

    /// Starts from a prepared grid, e.g. a restored or scripted layout.
    pub fn with_grid(config: CrushConfig, grid: Grid, seed: u64) -> Self {
        Self::assemble(config, grid, StdRng::seed_from_u64(seed))
    }

    fn assemble(config: CrushConfig, grid: Grid, rng: StdRng) -> Self {
        Self {
            clean_one_remaining: config.clean_one,
            forced_swap_remaining: config.forced_swap,
            shuffle_remaining: config.shuffles,
            config,
            grid,
            rng,
            score: 0,
            phase: Phase::Idle,
            turn: TurnContext::default(),
            pending: None,
            last_turn: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// New grid, zero score, full tool budgets. Listeners are kept.
    pub fn restart(&mut self) {
        self.grid = Grid::generate(
            self.config.grid_size as usize,
            self.config.palette_size,
            &mut self.rng,
        );
        self.score = 0;
        self.phase = Phase::Idle;
        self.turn = TurnContext::default();
        self.pending = None;
        self.last_turn.clear();
        self.clean_one_remaining = self.config.clean_one;
        self.forced_swap_remaining = self.config.forced_swap;
        self.shuffle_remaining = self.config.shuffles;
        let all: Vec<Position> = self.grid.positions().collect();
        self.notify(all);
    }

    pub fn config(&self) -> &CrushConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    pub fn turn(&self) -> &TurnContext {
        &self.turn
    }

    /// Passes of the most recent player action, oldest first.
    pub fn last_turn(&self) -> &[ResolutionStep] {
        &self.last_turn
    }

    pub fn remaining(&self, tool: Tool) -> u32 {
        match tool {
            Tool::CleanOne => self.clean_one_remaining,
            Tool::ForcedSwap => self.forced_swap_remaining,
            Tool::Shuffle => self.shuffle_remaining,
        }
    }

    pub fn has_legal_move(&self) -> bool {
        self.grid.has_legal_move()
    }

    pub fn snapshot(&self) -> GridSnapshot {
        GridSnapshot {
            size: self.grid.size() as u8,
            cells: self.grid.cells().to_vec(),
            score: self.score,
            is_idle: self.is_idle(),
            combo: self.turn.combo,
            clean_one_remaining: self.clean_one_remaining,
            forced_swap_remaining: self.forced_swap_remaining,
            shuffle_remaining: self.shuffle_remaining,
        }
    }

    pub fn on_cells_changed(&mut self, listener: impl FnMut(&CellsChanged) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Swaps two adjacent tiles and resolves the whole turn.
    pub fn request_swap(&mut self, a: Position, b: Position) -> Result<SwapOutcome, CrushError> {
        let outcome = self.begin_swap(a, b)?;
        self.run_to_idle();
        Ok(outcome)
    }

    /// Swaps two adjacent tiles and leaves any resolution pending for [`Self::step`].
    pub fn begin_swap(&mut self, a: Position, b: Position) -> Result<SwapOutcome, CrushError> {
        self.check_swap(a, b)?;

        let (ta, tb) = (self.grid.get(a), self.grid.get(b));
        if let Some((rainbow, target)) = rainbow_pair(a, ta, b, tb) {
            self.begin_rainbow(rainbow, target);
            return Ok(SwapOutcome::Rainbow);
        }

        Ok(self.attempt_swap(a, b, false))
    }

    /// Commits an adjacent swap even when nothing matches.
    pub fn forced_swap(&mut self, a: Position, b: Position) -> Result<SwapOutcome, CrushError> {
        self.check_swap(a, b)?;
        self.take_tool(Tool::ForcedSwap)?;

        let outcome = self.attempt_swap(a, b, true);
        self.run_to_idle();
        Ok(outcome)
    }

    /// Fires a rainbow at the color of `target`; the two cells need not be adjacent.
    pub fn use_rainbow(&mut self, a: Position, b: Position) -> Result<(), CrushError> {
        self.ensure_idle()?;
        self.ensure_contains(a)?;
        self.ensure_contains(b)?;

        let (rainbow, target) = rainbow_pair(a, self.grid.get(a), b, self.grid.get(b))
            .ok_or(CrushError::NotRainbowPair)?;
        self.begin_rainbow(rainbow, target);
        self.run_to_idle();
        Ok(())
    }

    /// Clears one chosen cell for a flat award.
    pub fn clean_one(&mut self, pos: Position) -> Result<(), CrushError> {
        self.ensure_idle()?;
        self.ensure_contains(pos)?;
        self.take_tool(Tool::CleanOne)?;

        self.start_action(false);
        self.pending = Some(Pending::Clear {
            kind: StepKind::CleanOne,
            cells: vec![pos],
            points: u64::from(self.config.scores.clean_one),
        });
        self.run_to_idle();
        Ok(())
    }

    /// Reorders every tile, retrying until some move is available or attempts run out.
    pub fn shuffle(&mut self) -> Result<(), CrushError> {
        self.ensure_idle()?;
        self.take_tool(Tool::Shuffle)?;

        self.start_action(false);

        let attempts = self.config.shuffle_attempts.max(1);
        for attempt in 1..=attempts {
            self.grid.shuffle(&mut self.rng);
            if self.grid.has_legal_move() {
                debug!("crush: shuffle found a move after {attempt} attempt(s)");
                break;
            }
        }

        let all: Vec<Position> = self.grid.positions().collect();
        self.notify(all);

        let matches = self.grid.find_matches();
        if matches.is_empty() {
            self.finalize_turn();
        } else {
            self.pending = Some(Pending::Match {
                cells: matches,
                player_initiated: false,
            });
        }
        self.run_to_idle();
        Ok(())
    }

    /// Runs pending passes until the turn settles.
    pub fn run_to_idle(&mut self) {
        while self.pending.is_some() {
            if self.step().is_err() {
                break;
            }
        }
    }

    /// Performs one resolution pass.
    pub fn step(&mut self) -> Result<ResolutionStep, CrushError> {
        let pending = self.pending.take().ok_or(CrushError::NothingToStep)?;

        let mut step = match pending {
            Pending::Match {
                cells,
                player_initiated,
            } => self.resolve_matches(cells, player_initiated),
            Pending::Clear {
                kind,
                cells,
                points,
            } => self.clear_cells(kind, cells, points),
        };

        step.moved = self.grid.apply_gravity(&mut self.rng);

        let next = self.grid.find_matches();
        if next.is_empty() {
            step.bonus_bomb = self.finalize_turn();
            step.settled = true;
        } else {
            // Cascades never spawn specials or earn the combo multiplier.
            self.pending = Some(Pending::Match {
                cells: next,
                player_initiated: false,
            });
        }

        let mut changed: BTreeSet<Position> = step.cleared.iter().copied().collect();
        changed.extend(step.moved.iter().copied());
        changed.extend(step.bonus_bomb);
        self.notify(changed.into_iter().collect());

        self.last_turn.push(step.clone());
        Ok(step)
    }

    fn attempt_swap(&mut self, a: Position, b: Position, forced: bool) -> SwapOutcome {
        self.start_action(true);
        self.phase = Phase::Swapping;
        self.grid.swap(a, b);

        if let Some(kind) = swap_detonation(self.grid.get(a), self.grid.get(b)) {
            let mut cells = BTreeSet::new();
            for pos in [a, b] {
                if self.grid.get(pos) == Some(kind) {
                    cells.extend(self.blast_cells(kind, pos));
                }
            }
            let (step_kind, per_tile) = match kind {
                Tile::Bomb => (StepKind::CrossBomb, self.config.scores.cross_bomb_tile),
                Tile::RowBomb => (StepKind::RowBomb, self.config.scores.line_bomb_tile),
                _ => (StepKind::ColBomb, self.config.scores.line_bomb_tile),
            };
            info!("crush: {step_kind:?} detonated, {} tiles", cells.len());

            self.turn.player_initiated = false;
            self.pending = Some(Pending::Clear {
                kind: step_kind,
                points: cells.len() as u64 * u64::from(per_tile),
                cells: cells.into_iter().collect(),
            });
            self.phase = Phase::Resolving;
            self.notify(vec![a, b]);
            return SwapOutcome::Detonated;
        }

        let matches = self.grid.find_matches();
        if !matches.is_empty() {
            self.turn.combo += 1;
            self.pending = Some(Pending::Match {
                cells: matches,
                player_initiated: true,
            });
            self.phase = Phase::Resolving;
            self.notify(vec![a, b]);
            return SwapOutcome::Matched;
        }

        if forced {
            self.notify(vec![a, b]);
            self.finalize_turn();
            return SwapOutcome::Committed;
        }

        self.grid.swap(a, b);
        self.turn.finish();
        self.phase = Phase::Idle;
        SwapOutcome::Reverted
    }

    fn begin_rainbow(&mut self, rainbow: Position, color: u8) {
        self.start_action(false);

        let mut cells: Vec<Position> = self
            .grid
            .positions()
            .filter(|&pos| self.grid.get(pos) == Some(Tile::Color(color)))
            .collect();
        cells.push(rainbow);
        cells.sort();

        info!("crush: rainbow on color {color}, {} tiles", cells.len());
        self.pending = Some(Pending::Clear {
            kind: StepKind::Rainbow,
            points: cells.len() as u64 * u64::from(self.config.scores.rainbow_tile),
            cells,
        });
    }

    fn resolve_matches(&mut self, cells: Vec<Position>, player_initiated: bool) -> ResolutionStep {
        let mut spawned = None;
        if player_initiated {
            let (max_bombs, max_rainbows) =
                (self.config.max_bombs_per_turn, self.config.max_rainbows_per_turn);
            if let Some(tile) = special_for_match(&cells)
                && self.turn.allow_spawn(tile, max_bombs, max_rainbows)
                && let Some(&pos) = cells.choose(&mut self.rng)
            {
                debug!("crush: spawning {tile:?} at ({}, {})", pos.row, pos.col);
                spawned = Some((pos, tile));
            }
        }

        let multiplier = if player_initiated {
            self.turn.combo_multiplier()
        } else {
            1
        };
        let points =
            cells.len() as u64 * u64::from(self.config.scores.match_tile) * u64::from(multiplier);
        self.score += points;
        self.turn.cleared += cells.len() as u32;

        for &pos in &cells {
            self.grid.set(pos, None);
        }
        if let Some((pos, tile)) = spawned {
            self.grid.set(pos, Some(tile));
        }

        ResolutionStep {
            kind: StepKind::Match,
            cleared: cells,
            points,
            multiplier,
            spawned,
            moved: Vec::new(),
            settled: false,
            bonus_bomb: None,
        }
    }

    fn clear_cells(&mut self, kind: StepKind, cells: Vec<Position>, points: u64) -> ResolutionStep {
        self.score += points;
        self.turn.cleared += cells.len() as u32;
        for &pos in &cells {
            self.grid.set(pos, None);
        }

        ResolutionStep {
            kind,
            cleared: cells,
            points,
            multiplier: 1,
            spawned: None,
            moved: Vec::new(),
            settled: false,
            bonus_bomb: None,
        }
    }

    /// Awards the clear-count bomb, resets per-turn state and unlocks input.
    fn finalize_turn(&mut self) -> Option<Position> {
        let mut bonus = None;
        if self.turn.player_initiated
            && self.turn.cleared >= self.config.bomb_reward_threshold
            && self.turn.bombs_spawned < self.config.max_bombs_per_turn
        {
            let candidates: Vec<Position> = self
                .grid
                .positions()
                .filter(|&pos| matches!(self.grid.get(pos), Some(tile) if tile != Tile::Bomb))
                .collect();
            if let Some(&pos) = candidates.choose(&mut self.rng) {
                self.grid.set(pos, Some(Tile::Bomb));
                self.turn.bombs_spawned += 1;
                info!("crush: bonus bomb at ({}, {})", pos.row, pos.col);
                bonus = Some(pos);
            }
        }

        debug!(
            "crush: turn settled, cleared={} score={}",
            self.turn.cleared, self.score
        );
        self.turn.finish();
        self.pending = None;
        self.phase = Phase::Idle;
        bonus
    }

    fn start_action(&mut self, player_initiated: bool) {
        self.last_turn.clear();
        self.turn.begin(player_initiated);
        self.phase = Phase::Resolving;
    }

    fn blast_cells(&self, kind: Tile, pos: Position) -> Vec<Position> {
        let size = self.grid.size() as u8;
        let row = (0..size).map(move |c| Position::new(pos.row, c));
        let col = (0..size).map(move |r| Position::new(r, pos.col));
        match kind {
            Tile::RowBomb => row.collect(),
            Tile::ColBomb => col.collect(),
            _ => row.chain(col).collect(),
        }
    }

    fn check_swap(&self, a: Position, b: Position) -> Result<(), CrushError> {
        self.ensure_idle()?;
        self.ensure_contains(a)?;
        self.ensure_contains(b)?;
        if !a.is_adjacent(b) {
            return Err(CrushError::NotAdjacent);
        }
        Ok(())
    }

    fn ensure_idle(&self) -> Result<(), CrushError> {
        if self.is_idle() {
            Ok(())
        } else {
            Err(CrushError::Busy)
        }
    }

    fn ensure_contains(&self, pos: Position) -> Result<(), CrushError> {
        if self.grid.contains(pos) {
            Ok(())
        } else {
            Err(CrushError::OutOfBounds {
                row: pos.row,
                col: pos.col,
            })
        }
    }

    fn take_tool(&mut self, tool: Tool) -> Result<(), CrushError> {
        let remaining = match tool {
            Tool::CleanOne => &mut self.clean_one_remaining,
            Tool::ForcedSwap => &mut self.forced_swap_remaining,
            Tool::Shuffle => &mut self.shuffle_remaining,
        };
        if *remaining == 0 {
            return Err(CrushError::ToolExhausted(tool));
        }
        *remaining -= 1;
        Ok(())
    }

    fn notify(&mut self, cells: Vec<Position>) {
        let tiles = cells.iter().map(|&pos| (pos, self.grid.get(pos))).collect();
        let event = CellsChanged {
            cells,
            tiles,
            score: self.score,
        };
        for listener in &mut self.listeners {
            listener(&event);
        }
    }
}

/// Cross bombs take precedence over row bombs, row bombs over column bombs.
fn swap_detonation(a: Option<Tile>, b: Option<Tile>) -> Option<Tile> {
    [Tile::Bomb, Tile::RowBomb, Tile::ColBomb]
        .into_iter()
        .find(|kind| a == Some(*kind) || b == Some(*kind))
}

/// `(rainbow position, target color)` when one tile is a rainbow and the other is plain.
fn rainbow_pair(
    a: Position,
    ta: Option<Tile>,
    b: Position,
    tb: Option<Tile>,
) -> Option<(Position, u8)> {
    match (ta?, tb?) {
        (Tile::Rainbow, Tile::Color(c)) => Some((a, c)),
        (Tile::Color(c), Tile::Rainbow) => Some((b, c)),
        _ => None,
    }
}
