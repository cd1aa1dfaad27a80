//! Shared room record for online Gomoku and the pure transactions that edit it.
//!
//! Every function here takes the latest stored record and returns the record to commit, or a
//! rejection. They are meant to run inside [`crate::sync::store::RoomStore::transactional_update`],
//! so turn order and occupancy are always re-checked against authoritative state.

use std::fmt;

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use web_time::{SystemTime, UNIX_EPOCH};

use crate::error::SyncError;
use crate::gomoku::board::{Board, Stone, BOARD_SIZE, NUM_CELLS};
use crate::gomoku::rules::check_win;
use crate::types::Position;

const CLIENT_ID_LEN: usize = 26;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOutcome {
    BlackWin,
    WhiteWin,
    Draw,
}

impl GameOutcome {
    pub fn winner(self) -> Option<Stone> {
        match self {
            GameOutcome::BlackWin => Some(Stone::Black),
            GameOutcome::WhiteWin => Some(Stone::White),
            GameOutcome::Draw => None,
        }
    }

    fn win_for(stone: Stone) -> Self {
        match stone {
            Stone::Black => GameOutcome::BlackWin,
            Stone::White => GameOutcome::WhiteWin,
        }
    }
}

/// What a client is in a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Black,
    White,
    Spectator,
}

impl Role {
    pub fn stone(self) -> Option<Stone> {
        match self {
            Role::Black => Some(Stone::Black),
            Role::White => Some(Stone::White),
            Role::Spectator => None,
        }
    }

    pub fn is_player(self) -> bool {
        self != Role::Spectator
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Black => "black",
            Role::White => "white",
            Role::Spectator => "spectator",
        };
        f.write_str(name)
    }
}

/// Opaque per-browser identifier. Carries no authority beyond claiming seats.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    pub fn generate(rng: &mut StdRng) -> Self {
        let id = (0..CLIENT_ID_LEN)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ClientId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for ClientId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The stored room document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomState {
    pub room_code: String,
    pub status: RoomStatus,
    pub black_player_id: Option<ClientId>,
    pub white_player_id: Option<ClientId>,
    #[serde(default)]
    pub spectators: Vec<ClientId>,
    /// Row-major 15x15 board; `null` marks an empty cell.
    pub board: Vec<Option<Stone>>,
    pub current_player: Stone,
    pub game_over: bool,
    pub last_result: Option<GameOutcome>,
    #[serde(default)]
    pub last_move: Option<Position>,
    /// Milliseconds since the Unix epoch.
    pub last_activity_at: u64,
    /// Bumped by the store on every committed write.
    pub revision: u64,
    /// CRC32 of the board, used to skip redundant re-syncs.
    pub fingerprint: u32,
}

impl RoomState {
    /// Fresh room with the creator seated as black.
    pub fn new(room_code: impl Into<String>, creator: ClientId) -> Self {
        let board = Board::new();
        Self {
            room_code: room_code.into(),
            status: RoomStatus::Waiting,
            black_player_id: Some(creator),
            white_player_id: None,
            spectators: Vec::new(),
            fingerprint: board.fingerprint(),
            board: board.to_vec(),
            current_player: Stone::Black,
            game_over: false,
            last_result: None,
            last_move: None,
            last_activity_at: now_ms(),
            revision: 0,
        }
    }

    pub fn parsed_board(&self) -> Result<Board, SyncError> {
        Board::from_cells(&self.board).ok_or_else(|| {
            SyncError::Rejected(format!(
                "board has {} cells, expected {NUM_CELLS}",
                self.board.len()
            ))
        })
    }

    pub fn role_of(&self, client: &ClientId) -> Role {
        if self.black_player_id.as_ref() == Some(client) {
            Role::Black
        } else if self.white_player_id.as_ref() == Some(client) {
            Role::White
        } else {
            Role::Spectator
        }
    }

    pub fn winner(&self) -> Option<Stone> {
        self.last_result.and_then(GameOutcome::winner)
    }

    pub fn both_seated(&self) -> bool {
        self.black_player_id.is_some() && self.white_player_id.is_some()
    }

    /// Marks a committed write: next revision, fresh fingerprint and activity time.
    pub fn stamp(&mut self, previous_revision: u64) {
        self.revision = previous_revision + 1;
        self.last_activity_at = now_ms();
        self.fingerprint = match Board::from_cells(&self.board) {
            Some(board) => board.fingerprint(),
            None => 0,
        };
    }

    pub fn seat_holder(&self, role: Role) -> Option<&ClientId> {
        match role {
            Role::Black => self.black_player_id.as_ref(),
            Role::White => self.white_player_id.as_ref(),
            Role::Spectator => None,
        }
    }

    fn slot_mut(&mut self, role: Role) -> Option<&mut Option<ClientId>> {
        match role {
            Role::Black => Some(&mut self.black_player_id),
            Role::White => Some(&mut self.white_player_id),
            Role::Spectator => None,
        }
    }

    fn clear_seats_of(&mut self, client: &ClientId) -> bool {
        let mut freed = false;
        for slot in [&mut self.black_player_id, &mut self.white_player_id] {
            if slot.as_ref() == Some(client) {
                *slot = None;
                freed = true;
            }
        }
        freed
    }
}

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

/// Places `client`'s stone at `pos`, re-checking every rule against the stored record.
pub fn apply_move_to_room(
    room: &RoomState,
    client: &ClientId,
    pos: Position,
) -> Result<RoomState, SyncError> {
    let stone = room.role_of(client).stone().ok_or(SyncError::NotAPlayer)?;
    if room.game_over {
        return Err(SyncError::Rejected("game is over".into()));
    }
    if room.status != RoomStatus::Playing {
        return Err(SyncError::Rejected("waiting for an opponent".into()));
    }
    if room.current_player != stone {
        return Err(SyncError::Rejected("not your turn".into()));
    }
    let (row, col) = (pos.row as usize, pos.col as usize);
    if row >= BOARD_SIZE || col >= BOARD_SIZE {
        return Err(SyncError::Rejected(format!("({}, {}) is off the board", pos.row, pos.col)));
    }

    let mut board = room.parsed_board()?;
    if !board.place(row, col, stone) {
        return Err(SyncError::Rejected(format!("({}, {}) is occupied", pos.row, pos.col)));
    }

    let mut next = room.clone();
    next.last_move = Some(pos);
    if check_win(&board, row, col, stone) {
        next.game_over = true;
        next.last_result = Some(GameOutcome::win_for(stone));
        next.status = RoomStatus::Finished;
    } else if board.is_full() {
        next.game_over = true;
        next.last_result = Some(GameOutcome::Draw);
        next.status = RoomStatus::Finished;
    } else {
        next.current_player = stone.opponent();
    }
    next.board = board.to_vec();
    Ok(next)
}

/// Seats a joining client: reclaim an own seat, else the first free seat, else spectate.
pub fn seat_client(room: &RoomState, client: &ClientId) -> Result<RoomState, SyncError> {
    if room.role_of(client).is_player() {
        return Ok(room.clone());
    }
    let role = if room.black_player_id.is_none() {
        Role::Black
    } else if room.white_player_id.is_none() {
        Role::White
    } else {
        Role::Spectator
    };
    claim_slot(room, client, role)
}

/// Moves `client` into `role`, releasing whatever it held before.
pub fn claim_slot(room: &RoomState, client: &ClientId, role: Role) -> Result<RoomState, SyncError> {
    if room.seat_holder(role).is_some_and(|holder| holder != client) {
        return Err(SyncError::SlotTaken(role));
    }

    let mut next = room.clone();
    let had_seat = next.clear_seats_of(client);
    next.spectators.retain(|id| id != client);

    match next.slot_mut(role) {
        Some(slot) => *slot = Some(client.clone()),
        None => next.spectators.push(client.clone()),
    }

    if next.both_seated() && next.status == RoomStatus::Waiting {
        next.status = RoomStatus::Playing;
    } else if had_seat && !next.both_seated() && next.status == RoomStatus::Playing {
        next.status = RoomStatus::Waiting;
    }
    Ok(next)
}

/// Drops `client` from the room. A player leaving mid-game puts the room back to waiting.
pub fn release_slot(room: &RoomState, client: &ClientId) -> Result<RoomState, SyncError> {
    let mut next = room.clone();
    let freed = next.clear_seats_of(client);
    next.spectators.retain(|id| id != client);

    if freed && next.status == RoomStatus::Playing {
        next.status = RoomStatus::Waiting;
    }
    Ok(next)
}

/// New game on a cleared board. Only a seated player may start one.
pub fn reset_room(room: &RoomState, client: &ClientId) -> Result<RoomState, SyncError> {
    if !room.role_of(client).is_player() {
        return Err(SyncError::NotAPlayer);
    }

    let mut next = room.clone();
    next.board = Board::new().to_vec();
    next.current_player = Stone::Black;
    next.game_over = false;
    next.last_result = None;
    next.last_move = None;
    next.status = if next.both_seated() {
        RoomStatus::Playing
    } else {
        RoomStatus::Waiting
    };
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn id(s: &str) -> ClientId {
        ClientId::from(s)
    }

    fn playing_room() -> RoomState {
        let room = RoomState::new("ABCD", id("alice"));
        seat_client(&room, &id("bob")).unwrap()
    }

    #[test]
    fn t01_creator_is_black_and_second_player_starts_the_game() {
        let room = RoomState::new("ABCD", id("alice"));
        assert_eq!(room.role_of(&id("alice")), Role::Black);
        assert_eq!(room.status, RoomStatus::Waiting);

        let room = seat_client(&room, &id("bob")).unwrap();
        assert_eq!(room.role_of(&id("bob")), Role::White);
        assert_eq!(room.status, RoomStatus::Playing);

        let room = seat_client(&room, &id("carol")).unwrap();
        assert_eq!(room.role_of(&id("carol")), Role::Spectator);
        assert_eq!(room.spectators, vec![id("carol")]);

        // Rejoining keeps the seat.
        let again = seat_client(&room, &id("alice")).unwrap();
        assert_eq!(again, room);
    }

    #[test]
    fn t02_move_is_checked_against_stored_state() {
        let room = playing_room();

        let room = apply_move_to_room(&room, &id("alice"), Position::new(7, 7)).unwrap();
        assert_eq!(room.board[7 * BOARD_SIZE + 7], Some(Stone::Black));
        assert_eq!(room.current_player, Stone::White);
        assert_eq!(room.last_move, Some(Position::new(7, 7)));

        assert_eq!(
            apply_move_to_room(&room, &id("alice"), Position::new(0, 0)),
            Err(SyncError::Rejected("not your turn".into()))
        );
        assert_eq!(
            apply_move_to_room(&room, &id("bob"), Position::new(7, 7)),
            Err(SyncError::Rejected("(7, 7) is occupied".into()))
        );
        assert_eq!(
            apply_move_to_room(&room, &id("carol"), Position::new(0, 0)),
            Err(SyncError::NotAPlayer)
        );
    }

    #[test]
    fn t03_no_moves_before_an_opponent_arrives() {
        let room = RoomState::new("ABCD", id("alice"));

        assert_eq!(
            apply_move_to_room(&room, &id("alice"), Position::new(7, 7)),
            Err(SyncError::Rejected("waiting for an opponent".into()))
        );
    }

    #[test]
    fn t04_five_in_a_row_finishes_the_room() {
        let mut room = playing_room();
        for c in 0..4 {
            room = apply_move_to_room(&room, &id("alice"), Position::new(0, c)).unwrap();
            room = apply_move_to_room(&room, &id("bob"), Position::new(1, c)).unwrap();
        }

        let room = apply_move_to_room(&room, &id("alice"), Position::new(0, 4)).unwrap();

        assert!(room.game_over);
        assert_eq!(room.last_result, Some(GameOutcome::BlackWin));
        assert_eq!(room.winner(), Some(Stone::Black));
        assert_eq!(room.status, RoomStatus::Finished);
        assert_eq!(room.current_player, Stone::Black);
        assert_eq!(
            apply_move_to_room(&room, &id("bob"), Position::new(5, 5)),
            Err(SyncError::Rejected("game is over".into()))
        );
    }

    #[test]
    fn t05_filling_the_board_without_five_is_a_draw() {
        let mut room = playing_room();
        let mut board = Board::new();
        for r in 0..BOARD_SIZE {
            for c in 0..BOARD_SIZE {
                if (r, c) != (14, 14) {
                    let stone = if (c / 2 + r) % 2 == 0 { Stone::Black } else { Stone::White };
                    board.place(r, c, stone);
                }
            }
        }
        room.board = board.to_vec();
        room.current_player = Stone::White;

        let room = apply_move_to_room(&room, &id("bob"), Position::new(14, 14)).unwrap();

        assert!(room.game_over);
        assert_eq!(room.last_result, Some(GameOutcome::Draw));
        assert_eq!(room.winner(), None);
    }

    #[test]
    fn t06_slots_can_be_claimed_only_when_free() {
        let room = playing_room();

        assert_eq!(
            claim_slot(&room, &id("carol"), Role::White),
            Err(SyncError::SlotTaken(Role::White))
        );

        let room = claim_slot(&room, &id("bob"), Role::Spectator).unwrap();
        assert_eq!(room.white_player_id, None);
        assert_eq!(room.status, RoomStatus::Waiting);

        let room = claim_slot(&room, &id("carol"), Role::White).unwrap();
        assert_eq!(room.role_of(&id("carol")), Role::White);
        assert_eq!(room.status, RoomStatus::Playing);
        assert_eq!(room.spectators, vec![id("bob")]);
    }

    #[test]
    fn t07_release_and_reset() {
        let mut room = playing_room();
        room = apply_move_to_room(&room, &id("alice"), Position::new(3, 3)).unwrap();

        assert_eq!(reset_room(&room, &id("carol")), Err(SyncError::NotAPlayer));
        let reset = reset_room(&room, &id("bob")).unwrap();
        assert!(reset.board.iter().all(Option::is_none));
        assert_eq!(reset.current_player, Stone::Black);
        assert_eq!(reset.status, RoomStatus::Playing);

        let left = release_slot(&reset, &id("bob")).unwrap();
        assert_eq!(left.white_player_id, None);
        assert_eq!(left.status, RoomStatus::Waiting);
    }

    #[test]
    fn stamp_bumps_revision_and_fingerprint() {
        let mut room = playing_room();
        let empty_fingerprint = room.fingerprint;
        room = apply_move_to_room(&room, &id("alice"), Position::new(7, 7)).unwrap();

        room.stamp(4);

        assert_eq!(room.revision, 5);
        assert_ne!(room.fingerprint, empty_fingerprint);
        assert!(room.last_activity_at > 0);
    }

    #[test]
    fn room_wire_shape_uses_plain_strings() {
        let mut room = playing_room();
        room = apply_move_to_room(&room, &id("alice"), Position::new(0, 1)).unwrap();

        let json = serde_json::to_value(&room).unwrap();

        assert_eq!(json["room_code"], "ABCD");
        assert_eq!(json["status"], "playing");
        assert_eq!(json["black_player_id"], "alice");
        assert_eq!(json["current_player"], "white");
        assert_eq!(json["board"][0], serde_json::Value::Null);
        assert_eq!(json["board"][1], "black");
        assert_eq!(json["board"].as_array().unwrap().len(), NUM_CELLS);

        let back: RoomState = serde_json::from_value(json).unwrap();
        assert_eq!(back, room);
    }

    #[test]
    fn older_records_without_optional_fields_still_parse() {
        let mut json = serde_json::to_value(RoomState::new("WXYZ", id("alice"))).unwrap();
        let fields = json.as_object_mut().unwrap();
        fields.remove("spectators");
        fields.remove("last_move");
        fields.insert("last_result".into(), "white_win".into());

        let room: RoomState = serde_json::from_value(json).unwrap();

        assert!(room.spectators.is_empty());
        assert_eq!(room.winner(), Some(Stone::White));
    }

    #[test]
    fn client_ids_are_base36_and_distinct() {
        let mut rng = StdRng::seed_from_u64(99);
        let a = ClientId::generate(&mut rng);
        let b = ClientId::generate(&mut rng);

        assert_eq!(a.as_str().len(), CLIENT_ID_LEN);
        assert!(a.as_str().chars().all(|ch| ch.is_ascii_digit() || ch.is_ascii_lowercase()));
        assert_ne!(a, b);
    }
}
