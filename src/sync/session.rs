use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, info, warn};

use crate::error::SyncError;
use crate::gomoku::ai::Difficulty;
use crate::gomoku::board::Stone;
use crate::gomoku::game::GomokuGame;
use crate::sync::room::{
    apply_move_to_room, claim_slot, release_slot, reset_room, seat_client, ClientId, Role,
    RoomState, RoomStatus,
};
use crate::sync::store::{RoomStore, Subscription};
use crate::types::{GomokuState, Position};

/// One client's view of an online Gomoku room.
///
/// Local moves are placed optimistically, then committed through the store's transaction. The
/// stored record always wins: a rejected commit reloads it, and remote updates queued by the
/// subscription are applied on [`OnlineSession::poll`].
pub struct OnlineSession<S: RoomStore> {
    store: S,
    client_id: ClientId,
    room: RoomState,
    role: Role,
    game: GomokuGame,
    inbox: Rc<RefCell<Vec<RoomState>>>,
    subscription: Option<Subscription>,
}

impl<S: RoomStore> OnlineSession<S> {
    /// Opens `room_code`, creating it with this client as black when it does not exist yet.
    pub fn join(store: S, room_code: &str, client_id: ClientId) -> Result<Self, SyncError> {
        let mut seat = |room: &RoomState| seat_client(room, &client_id);
        let room = match store.get_room(room_code)? {
            None => match store.create_room(RoomState::new(room_code, client_id.clone())) {
                Err(SyncError::RoomExists(_)) => store.transactional_update(room_code, &mut seat)?,
                created => created?,
            },
            Some(_) => store.transactional_update(room_code, &mut seat)?,
        };

        let inbox = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&inbox);
        let subscription = store.subscribe(
            room_code,
            Box::new(move |room: &RoomState| sink.borrow_mut().push(room.clone())),
        )?;

        let role = room.role_of(&client_id);
        info!("sync: {client_id} joined {room_code} as {role}");

        let mut session = Self {
            store,
            client_id,
            role,
            // Only mirrors board and turn state; the AI selector is never asked to move.
            game: GomokuGame::new(Difficulty::default(), 0),
            inbox,
            subscription: Some(subscription),
            room: room.clone(),
        };
        session.load(room);
        Ok(session)
    }

    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn room(&self) -> &RoomState {
        &self.room
    }

    pub fn status(&self) -> RoomStatus {
        self.room.status
    }

    pub fn is_my_turn(&self) -> bool {
        !self.game.is_game_over
            && self.room.status == RoomStatus::Playing
            && self.role.stone() == Some(self.game.current_player)
    }

    pub fn cell(&self, row: u8, col: u8) -> Option<Stone> {
        self.game.cell(row, col)
    }

    pub fn game_state(&self) -> GomokuState {
        self.game.to_game_state()
    }

    /// Places a stone locally, then commits it. On rejection the authoritative record is reloaded.
    pub fn submit_move(&mut self, row: u8, col: u8) -> Result<(), SyncError> {
        let stone = self.role.stone().ok_or(SyncError::NotAPlayer)?;
        if !self.is_my_turn() {
            return Err(SyncError::Rejected("not your turn".into()));
        }
        self.game
            .apply_move(row, col, stone)
            .map_err(|err| SyncError::Rejected(err.to_string()))?;

        let pos = Position::new(row, col);
        let client_id = self.client_id.clone();
        let mut place = |room: &RoomState| apply_move_to_room(room, &client_id, pos);
        match self.store.transactional_update(&self.room.room_code, &mut place) {
            Ok(room) => {
                self.apply_remote(room);
                Ok(())
            }
            Err(err) => {
                warn!("sync: move ({row}, {col}) rejected: {err}");
                self.rollback();
                Err(err)
            }
        }
    }

    /// Applies queued remote updates. Returns how many were newer than the local view.
    pub fn poll(&mut self) -> usize {
        let queued: Vec<RoomState> = self.inbox.borrow_mut().drain(..).collect();
        queued
            .into_iter()
            .map(|room| self.apply_remote(room))
            .filter(|applied| *applied)
            .count()
    }

    /// Re-reads the stored record directly, for callers that missed notifications.
    pub fn refresh(&mut self) -> Result<(), SyncError> {
        match self.store.get_room(&self.room.room_code)? {
            Some(room) => {
                self.apply_remote(room);
                Ok(())
            }
            None => Err(SyncError::RoomNotFound(self.room.room_code.clone())),
        }
    }

    pub fn become_player(&mut self, role: Role) -> Result<(), SyncError> {
        self.transact(|room, client| claim_slot(room, client, role))
    }

    pub fn become_spectator(&mut self) -> Result<(), SyncError> {
        self.transact(|room, client| claim_slot(room, client, Role::Spectator))
    }

    /// Clears the board for a new game.
    pub fn start_game(&mut self) -> Result<(), SyncError> {
        self.transact(reset_room)
    }

    /// Gives up the seat and stops listening. Store failures are logged, never fatal.
    pub fn leave(mut self) {
        let client_id = self.client_id.clone();
        if let Err(err) = self
            .store
            .transactional_update(&self.room.room_code, &mut |room| release_slot(room, &client_id))
        {
            warn!("sync: could not release seat in {}: {err}", self.room.room_code);
        }
        if let Some(subscription) = self.subscription.take() {
            self.store.unsubscribe(subscription);
        }
        info!("sync: {} left {}", self.client_id, self.room.room_code);
    }

    fn transact(
        &mut self,
        mut change: impl FnMut(&RoomState, &ClientId) -> Result<RoomState, SyncError>,
    ) -> Result<(), SyncError> {
        let client_id = self.client_id.clone();
        let room = self
            .store
            .transactional_update(&self.room.room_code, &mut |room| change(room, &client_id))?;
        self.apply_remote(room);
        Ok(())
    }

    fn rollback(&mut self) {
        match self.store.get_room(&self.room.room_code) {
            Ok(Some(room)) => {
                self.apply_remote(room);
            }
            Ok(None) => warn!("sync: room {} vanished", self.room.room_code),
            Err(err) => warn!("sync: reload failed, restoring last known state: {err}"),
        }
        // Always reload: the optimistic stone is only in the local game.
        let room = self.room.clone();
        self.load(room);
    }

    /// Adopts a record newer than the local one. Returns false for stale updates.
    fn apply_remote(&mut self, room: RoomState) -> bool {
        if room.revision <= self.room.revision {
            return false;
        }

        let role = room.role_of(&self.client_id);
        if role != self.role {
            if self.role.is_player() {
                warn!("sync: {} lost the {} seat, now {role}", self.client_id, self.role);
            } else {
                debug!("sync: {} is now {role}", self.client_id);
            }
            self.role = role;
        }

        let board_changed = room.fingerprint != self.room.fingerprint;
        self.room = room.clone();
        if board_changed
            || self.game.current_player != room.current_player
            || self.game.is_game_over != room.game_over
        {
            self.load(room);
        }
        true
    }

    fn load(&mut self, room: RoomState) {
        match room.parsed_board() {
            Ok(board) => self.game.load(
                board,
                room.current_player,
                room.game_over,
                room.winner(),
                room.last_move,
            ),
            Err(err) => warn!("sync: ignoring unreadable board in {}: {err}", room.room_code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::memory::MemoryRoomStore;
    use crate::sync::room::GameOutcome;

    fn join(store: &MemoryRoomStore, who: &str) -> OnlineSession<MemoryRoomStore> {
        OnlineSession::join(store.clone(), "GAME", ClientId::from(who)).unwrap()
    }

    #[test]
    fn t01_seats_are_handed_out_in_join_order() {
        let store = MemoryRoomStore::new();

        let alice = join(&store, "alice");
        let bob = join(&store, "bob");
        let carol = join(&store, "carol");

        assert_eq!(alice.role(), Role::Black);
        assert_eq!(bob.role(), Role::White);
        assert_eq!(carol.role(), Role::Spectator);
        assert_eq!(bob.status(), RoomStatus::Playing);

        let again = join(&store, "alice");
        assert_eq!(again.role(), Role::Black);
    }

    #[test]
    fn t02_moves_reach_the_other_client() {
        let store = MemoryRoomStore::new();
        let mut alice = join(&store, "alice");
        let mut bob = join(&store, "bob");
        alice.poll();

        alice.submit_move(7, 7).unwrap();
        assert_eq!(bob.cell(7, 7), None);

        assert!(bob.poll() >= 1);
        assert_eq!(bob.cell(7, 7), Some(Stone::Black));
        assert!(bob.is_my_turn());
        assert!(!alice.is_my_turn());
    }

    #[test]
    fn t03_out_of_turn_and_spectator_moves_are_refused_locally() {
        let store = MemoryRoomStore::new();
        let mut alice = join(&store, "alice");
        let mut bob = join(&store, "bob");
        let mut carol = join(&store, "carol");
        alice.poll();

        assert_eq!(bob.submit_move(0, 0), Err(SyncError::Rejected("not your turn".into())));
        assert_eq!(carol.submit_move(0, 0), Err(SyncError::NotAPlayer));
        assert_eq!(bob.cell(0, 0), None);
        assert_eq!(store.get_room("GAME").unwrap().unwrap().board[0], None);
    }

    #[test]
    fn t04_rejected_commit_rolls_back_to_the_stored_record() {
        let store = MemoryRoomStore::new();
        let mut alice = join(&store, "alice");
        let mut bob = join(&store, "bob");
        alice.poll();
        alice.submit_move(7, 7).unwrap();
        bob.poll();

        // Bob's seat is reassigned before he notices.
        let carol = ClientId::from("carol");
        store
            .transactional_update("GAME", &mut |room| {
                let room = release_slot(room, &ClientId::from("bob"))?;
                claim_slot(&room, &carol, Role::White)
            })
            .unwrap();

        assert_eq!(bob.submit_move(7, 8), Err(SyncError::NotAPlayer));
        assert_eq!(bob.cell(7, 8), None);
        assert_eq!(bob.cell(7, 7), Some(Stone::Black));
        assert_eq!(bob.role(), Role::Spectator);
    }

    #[test]
    fn t05_offline_commit_restores_last_known_board() {
        let store = MemoryRoomStore::new();
        let mut alice = join(&store, "alice");
        let _bob = join(&store, "bob");
        alice.poll();

        store.set_offline(true);
        let result = alice.submit_move(3, 3);
        store.set_offline(false);

        assert!(matches!(result, Err(SyncError::Unavailable(_))));
        assert_eq!(alice.cell(3, 3), None);
        assert!(alice.is_my_turn());
    }

    #[test]
    fn t06_win_is_shared_with_both_clients() {
        let store = MemoryRoomStore::new();
        let mut alice = join(&store, "alice");
        let mut bob = join(&store, "bob");
        alice.poll();

        for c in 0..4 {
            alice.submit_move(0, c).unwrap();
            bob.poll();
            bob.submit_move(1, c).unwrap();
            alice.poll();
        }
        alice.submit_move(0, 4).unwrap();
        bob.poll();

        for session in [&alice, &bob] {
            let state = session.game_state();
            assert!(state.is_game_over);
            assert_eq!(state.winner, Some(Stone::Black));
            assert_eq!(state.winning_line.len(), 5);
        }
        assert_eq!(bob.room().last_result, Some(GameOutcome::BlackWin));
        assert_eq!(bob.submit_move(5, 5), Err(SyncError::Rejected("not your turn".into())));
    }

    #[test]
    fn t07_start_game_clears_the_board_for_everyone() {
        let store = MemoryRoomStore::new();
        let mut alice = join(&store, "alice");
        let mut bob = join(&store, "bob");
        alice.poll();
        alice.submit_move(7, 7).unwrap();

        bob.poll();
        bob.start_game().unwrap();
        alice.poll();

        assert_eq!(alice.cell(7, 7), None);
        assert!(alice.is_my_turn());
        assert_eq!(alice.status(), RoomStatus::Playing);
    }

    #[test]
    fn t08_switching_between_spectator_and_player() {
        let store = MemoryRoomStore::new();
        let _alice = join(&store, "alice");
        let mut bob = join(&store, "bob");
        let mut carol = join(&store, "carol");

        assert_eq!(carol.become_player(Role::White), Err(SyncError::SlotTaken(Role::White)));

        bob.become_spectator().unwrap();
        assert_eq!(bob.role(), Role::Spectator);
        carol.poll();
        carol.become_player(Role::White).unwrap();

        assert_eq!(carol.role(), Role::White);
        assert_eq!(carol.status(), RoomStatus::Playing);
        bob.poll();
        assert_eq!(bob.role(), Role::Spectator);
    }

    #[test]
    fn t09_leave_releases_the_seat_and_stops_updates() {
        let store = MemoryRoomStore::new();
        let mut alice = join(&store, "alice");
        let bob = join(&store, "bob");
        alice.poll();

        bob.leave();
        assert_eq!(alice.poll(), 1);
        assert_eq!(alice.room().white_player_id, None);
        assert_eq!(alice.status(), RoomStatus::Waiting);

        let dave = join(&store, "dave");
        assert_eq!(dave.role(), Role::White);
    }

    #[test]
    fn stale_notifications_are_ignored() {
        let store = MemoryRoomStore::new();
        let mut alice = join(&store, "alice");
        let _bob = join(&store, "bob");

        assert_eq!(alice.poll(), 1);
        alice.submit_move(7, 7).unwrap();

        // The commit above already applied; its echo in the inbox is stale.
        assert_eq!(alice.poll(), 0);
    }
}
