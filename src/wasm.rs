//! Browser boundary. Invalid input from the UI is ignored here (`false`/`null`) and logged at
//! debug level; the core keeps returning typed errors.

use log::{debug, LevelFilter};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

use crate::crush::config::CrushConfig;
use crate::crush::engine::CrushEngine;
use crate::error::{CrushError, SyncError};
use crate::gomoku::ai::Difficulty;
use crate::gomoku::board::Stone;
use crate::gomoku::game::GomokuGame;
use crate::sync::room::{
    apply_move_to_room, claim_slot, release_slot, reset_room, seat_client, ClientId, Role,
    RoomState,
};
use crate::types::Position;

const CLIENT_ID_KEY: &str = "gomoku_clientId";

#[wasm_bindgen(start)]
pub fn bootstrap() {
    console_error_panic_hook::set_once();
    crate::logging::init(LevelFilter::Info);
}

fn js_seed() -> u64 {
    (js_sys::Math::random() * 9_007_199_254_740_992.0) as u64
}

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    to_value(value).map_err(|e| e.into())
}

fn stone_code(stone: Option<Stone>) -> u8 {
    stone.map_or(0, Stone::code)
}

fn stone_from_code(code: u8) -> Option<Stone> {
    match code {
        1 => Some(Stone::Black),
        2 => Some(Stone::White),
        _ => None,
    }
}

#[wasm_bindgen]
pub struct GomokuClient {
    game: GomokuGame,
}

#[wasm_bindgen]
impl GomokuClient {
    #[wasm_bindgen(constructor)]
    pub fn new(difficulty: Option<String>) -> GomokuClient {
        let difficulty = difficulty
            .as_deref()
            .map(Difficulty::from_label)
            .unwrap_or_default();
        Self {
            game: GomokuGame::new(difficulty, js_seed()),
        }
    }

    #[wasm_bindgen(js_name = setDifficulty)]
    pub fn set_difficulty(&mut self, label: &str) {
        self.game.set_difficulty(Difficulty::from_label(label));
    }

    /// 0 = empty, 1 = black, 2 = white.
    #[wasm_bindgen(js_name = getCell)]
    pub fn get_cell(&self, row: u8, col: u8) -> u8 {
        stone_code(self.game.cell(row, col))
    }

    /// Places for `player` (1 or 2). Returns false for any invalid move.
    #[wasm_bindgen(js_name = applyMove)]
    pub fn apply_move(&mut self, row: u8, col: u8, player: u8) -> bool {
        let Some(stone) = stone_from_code(player) else {
            return false;
        };
        match self.game.apply_move(row, col, stone) {
            Ok(()) => true,
            Err(err) => {
                debug!("gomoku: ignored move ({row}, {col}): {err}");
                false
            }
        }
    }

    /// Human move against the AI.
    pub fn place(&mut self, row: u8, col: u8) -> bool {
        match self.game.place(row, col) {
            Ok(()) => true,
            Err(err) => {
                debug!("gomoku: ignored move ({row}, {col}): {err}");
                false
            }
        }
    }

    /// AI reply as `{ row, col }`, or null when it is not the AI's turn.
    #[wasm_bindgen(js_name = aiMove)]
    pub fn ai_move(&mut self) -> Result<JsValue, JsValue> {
        match self.game.do_ai_move() {
            Ok(pos) => to_js(&pos),
            Err(err) => {
                debug!("gomoku: ai skipped: {err}");
                Ok(JsValue::NULL)
            }
        }
    }

    #[wasm_bindgen(js_name = isGameOver)]
    pub fn is_game_over(&self) -> bool {
        self.game.is_game_over
    }

    /// 0 while playing or after a draw.
    #[wasm_bindgen(js_name = getWinner)]
    pub fn get_winner(&self) -> u8 {
        stone_code(self.game.winner())
    }

    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> Result<JsValue, JsValue> {
        to_js(&self.game.to_game_state())
    }

    pub fn reset(&mut self) {
        self.game.reset();
    }
}

#[wasm_bindgen]
pub struct CrushClient {
    engine: CrushEngine,
}

#[wasm_bindgen]
impl CrushClient {
    /// `config` is a partial `CrushConfig`; missing or unreadable fields use defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue, seed: Option<f64>) -> Result<CrushClient, JsValue> {
        let config: CrushConfig = from_value(config).unwrap_or_default();
        let seed = seed.map_or_else(js_seed, |s| s as u64);
        let engine = CrushEngine::new(config, seed).map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(Self { engine })
    }

    #[wasm_bindgen(js_name = getGridSnapshot)]
    pub fn get_grid_snapshot(&self) -> Result<JsValue, JsValue> {
        to_js(&self.engine.snapshot())
    }

    #[wasm_bindgen(js_name = getScore)]
    pub fn get_score(&self) -> f64 {
        self.engine.score() as f64
    }

    #[wasm_bindgen(js_name = isIdle)]
    pub fn is_idle(&self) -> bool {
        self.engine.is_idle()
    }

    /// Swaps and resolves the whole turn. `a` and `b` are `{ row, col }`.
    #[wasm_bindgen(js_name = requestSwap)]
    pub fn request_swap(&mut self, a: JsValue, b: JsValue) -> Result<JsValue, JsValue> {
        let (a, b): (Position, Position) = (from_value(a)?, from_value(b)?);
        match self.engine.request_swap(a, b) {
            Ok(outcome) => to_js(&outcome),
            Err(err) => {
                debug!("crush: ignored swap: {err}");
                Ok(JsValue::NULL)
            }
        }
    }

    /// Swaps and leaves resolution to `step`, so the page can animate between passes.
    #[wasm_bindgen(js_name = beginSwap)]
    pub fn begin_swap(&mut self, a: JsValue, b: JsValue) -> Result<JsValue, JsValue> {
        let (a, b): (Position, Position) = (from_value(a)?, from_value(b)?);
        match self.engine.begin_swap(a, b) {
            Ok(outcome) => to_js(&outcome),
            Err(err) => {
                debug!("crush: ignored swap: {err}");
                Ok(JsValue::NULL)
            }
        }
    }

    /// Next resolution pass, or null once the turn has settled.
    pub fn step(&mut self) -> Result<JsValue, JsValue> {
        match self.engine.step() {
            Ok(step) => to_js(&step),
            Err(_) => Ok(JsValue::NULL),
        }
    }

    #[wasm_bindgen(js_name = lastTurn)]
    pub fn last_turn(&self) -> Result<JsValue, JsValue> {
        to_js(&self.engine.last_turn())
    }

    #[wasm_bindgen(js_name = cleanOne)]
    pub fn clean_one(&mut self, row: u8, col: u8) -> bool {
        report("clean-one", self.engine.clean_one(Position::new(row, col)))
    }

    #[wasm_bindgen(js_name = forcedSwap)]
    pub fn forced_swap(&mut self, a: JsValue, b: JsValue) -> Result<bool, JsValue> {
        let (a, b): (Position, Position) = (from_value(a)?, from_value(b)?);
        let result = self.engine.forced_swap(a, b).map(|_| ());
        Ok(report("forced swap", result))
    }

    #[wasm_bindgen(js_name = useRainbow)]
    pub fn use_rainbow(&mut self, a: JsValue, b: JsValue) -> Result<bool, JsValue> {
        let (a, b): (Position, Position) = (from_value(a)?, from_value(b)?);
        let result = self.engine.use_rainbow(a, b);
        Ok(report("rainbow", result))
    }

    pub fn shuffle(&mut self) -> bool {
        report("shuffle", self.engine.shuffle())
    }

    #[wasm_bindgen(js_name = hasLegalMove)]
    pub fn has_legal_move(&self) -> bool {
        self.engine.has_legal_move()
    }

    pub fn restart(&mut self) {
        self.engine.restart();
    }

    /// `callback({ cells, tiles, score })` after every change to the grid. `tiles` pairs each
    /// changed cell with its new tile, so the callback never needs to call back into the client.
    #[wasm_bindgen(js_name = onCellsChanged)]
    pub fn on_cells_changed(&mut self, callback: js_sys::Function) {
        self.engine.on_cells_changed(move |event| {
            let Ok(payload) = to_value(event) else {
                return;
            };
            if let Err(err) = callback.call1(&JsValue::NULL, &payload) {
                debug!("crush: cells-changed callback threw: {err:?}");
            }
        });
    }
}

fn report(action: &str, result: Result<(), CrushError>) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            debug!("crush: ignored {action}: {err}");
            false
        }
    }
}

/// Stable per-browser id, created on first use and kept in `localStorage`.
#[wasm_bindgen(js_name = clientId)]
pub fn client_id() -> String {
    let storage = web_sys::window().and_then(|window| window.local_storage().ok().flatten());
    if let Some(existing) = storage
        .as_ref()
        .and_then(|storage| storage.get_item(CLIENT_ID_KEY).ok().flatten())
    {
        return existing;
    }

    let id = ClientId::generate(&mut StdRng::seed_from_u64(js_seed()));
    if let Some(storage) = storage
        && storage.set_item(CLIENT_ID_KEY, id.as_str()).is_err()
    {
        debug!("sync: could not persist client id");
    }
    id.to_string()
}

fn room_from(room: JsValue) -> Result<RoomState, JsValue> {
    from_value(room).map_err(|e| e.into())
}

fn room_result(result: Result<RoomState, SyncError>) -> Result<JsValue, JsValue> {
    match result {
        Ok(room) => to_js(&room),
        Err(err) => Err(JsValue::from_str(&err.to_string())),
    }
}

/// Fresh room record with `client_id` seated as black.
#[wasm_bindgen(js_name = newRoom)]
pub fn new_room(room_code: &str, client_id: &str) -> Result<JsValue, JsValue> {
    to_js(&RoomState::new(room_code, ClientId::from(client_id)))
}

/// Transaction body for a move: returns the record to commit, or throws the rejection.
#[wasm_bindgen(js_name = roomApplyMove)]
pub fn room_apply_move(
    room: JsValue,
    client_id: &str,
    row: u8,
    col: u8,
) -> Result<JsValue, JsValue> {
    let room = room_from(room)?;
    let pos = Position::new(row, col);
    room_result(apply_move_to_room(&room, &ClientId::from(client_id), pos))
}

#[wasm_bindgen(js_name = roomSeatClient)]
pub fn room_seat_client(room: JsValue, client_id: &str) -> Result<JsValue, JsValue> {
    let room = room_from(room)?;
    room_result(seat_client(&room, &ClientId::from(client_id)))
}

/// `role` is `"black"`, `"white"` or `"spectator"`.
#[wasm_bindgen(js_name = roomClaimSlot)]
pub fn room_claim_slot(room: JsValue, client_id: &str, role: JsValue) -> Result<JsValue, JsValue> {
    let room = room_from(room)?;
    let role: Role = from_value(role)?;
    room_result(claim_slot(&room, &ClientId::from(client_id), role))
}

#[wasm_bindgen(js_name = roomReleaseSlot)]
pub fn room_release_slot(room: JsValue, client_id: &str) -> Result<JsValue, JsValue> {
    let room = room_from(room)?;
    room_result(release_slot(&room, &ClientId::from(client_id)))
}

#[wasm_bindgen(js_name = roomReset)]
pub fn room_reset(room: JsValue, client_id: &str) -> Result<JsValue, JsValue> {
    let room = room_from(room)?;
    room_result(reset_room(&room, &ClientId::from(client_id)))
}
