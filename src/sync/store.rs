use crate::error::SyncError;
use crate::sync::room::RoomState;

pub type RoomListener = Box<dyn FnMut(&RoomState)>;

/// Handle returned by [`RoomStore::subscribe`]; hand it back to stop receiving updates.
#[derive(Debug, PartialEq, Eq)]
pub struct Subscription {
    pub room_code: String,
    pub id: u64,
}

/// Backing document store for online rooms.
///
/// Implementations own atomicity: `transactional_update` must run `update` against the latest
/// stored record and commit its result only if nothing else was written in between. The stored
/// record's `revision` is bumped on every commit and every subscriber of the room is told.
pub trait RoomStore {
    fn get_room(&self, room_code: &str) -> Result<Option<RoomState>, SyncError>;

    /// Fails with `RoomExists` if the code is taken.
    fn create_room(&self, room: RoomState) -> Result<RoomState, SyncError>;

    /// Read-modify-write. An `Err` from `update` aborts without writing and is passed through.
    fn transactional_update(
        &self,
        room_code: &str,
        update: &mut dyn FnMut(&RoomState) -> Result<RoomState, SyncError>,
    ) -> Result<RoomState, SyncError>;

    fn subscribe(&self, room_code: &str, listener: RoomListener) -> Result<Subscription, SyncError>;

    fn unsubscribe(&self, subscription: Subscription);
}
