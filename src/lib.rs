use wasm_bindgen::prelude::*;

pub mod crush;
pub mod error;
pub mod gomoku;
pub mod logging;
pub mod sync;
pub mod types;
pub mod wasm;

pub use crush::engine::CrushEngine;
pub use gomoku::game::GomokuGame;
pub use sync::session::OnlineSession;

#[wasm_bindgen]
pub fn wasm_ready() -> bool {
    true
}
