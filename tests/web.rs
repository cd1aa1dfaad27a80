#![cfg(target_arch = "wasm32")]

use game_hub::wasm::{CrushClient, GomokuClient, new_room, room_apply_move, room_seat_client};
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn wasm_is_ready() {
    assert!(game_hub::wasm_ready());
}

#[wasm_bindgen_test]
fn gomoku_client_ignores_invalid_moves() {
    let mut client = GomokuClient::new(Some("easy".into()));

    assert!(client.apply_move(7, 7, 1));
    assert!(!client.apply_move(7, 7, 2));
    assert!(!client.apply_move(0, 0, 1));
    assert_eq!(client.get_cell(7, 7), 1);
    assert!(!client.is_game_over());
    assert_eq!(client.get_winner(), 0);
}

#[wasm_bindgen_test]
fn gomoku_ai_answers_on_its_turn() {
    let mut client = GomokuClient::new(None);
    assert!(client.place(7, 7));

    let reply = client.ai_move().unwrap();
    assert!(!reply.is_null());
    assert!(client.ai_move().unwrap().is_null());
}

#[wasm_bindgen_test]
fn crush_client_uses_defaults_for_missing_config() {
    let client = CrushClient::new(JsValue::UNDEFINED, Some(7.0)).unwrap();

    assert!(client.is_idle());
    assert_eq!(client.get_score(), 0.0);
    assert!(!client.get_grid_snapshot().unwrap().is_null());
}

#[wasm_bindgen_test]
fn crush_swap_with_bad_positions_is_an_error() {
    let mut client = CrushClient::new(JsValue::UNDEFINED, Some(7.0)).unwrap();

    assert!(client.request_swap(JsValue::from_str("nope"), JsValue::NULL).is_err());
}

#[wasm_bindgen_test]
fn room_transactions_round_trip_through_js() {
    let room = new_room("ABCD", "alice").unwrap();
    let room = room_seat_client(room, "bob").unwrap();

    let room = room_apply_move(room, "alice", 7, 7).unwrap();
    assert!(room_apply_move(room, "alice", 7, 8).is_err());
}
