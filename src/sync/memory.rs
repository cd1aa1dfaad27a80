use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::error::SyncError;
use crate::sync::room::RoomState;
use crate::sync::store::{RoomListener, RoomStore, Subscription};

#[derive(Default)]
struct Inner {
    rooms: RefCell<HashMap<String, RoomState>>,
    listeners: RefCell<Vec<(Subscription, RoomListener)>>,
    next_id: Cell<u64>,
    offline: Cell<bool>,
}

/// Single-threaded in-process store. Clones share the same rooms, so several sessions can play
/// against each other in one page or one test.
///
/// Listeners run synchronously during the write that triggered them and must not subscribe or
/// unsubscribe from inside the callback.
#[derive(Clone, Default)]
pub struct MemoryRoomStore {
    inner: Rc<Inner>,
}

impl MemoryRoomStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates a lost connection: every call fails with `Unavailable` until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.set(offline);
    }

    pub fn room_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.inner.rooms.borrow().keys().cloned().collect();
        codes.sort();
        codes
    }

    fn ensure_online(&self) -> Result<(), SyncError> {
        if self.inner.offline.get() {
            Err(SyncError::Unavailable("memory store is offline".into()))
        } else {
            Ok(())
        }
    }

    fn broadcast(&self, room: &RoomState) {
        let mut listeners = self.inner.listeners.borrow_mut();
        for (subscription, listener) in listeners.iter_mut() {
            if subscription.room_code == room.room_code {
                listener(room);
            }
        }
    }
}

impl RoomStore for MemoryRoomStore {
    fn get_room(&self, room_code: &str) -> Result<Option<RoomState>, SyncError> {
        self.ensure_online()?;
        Ok(self.inner.rooms.borrow().get(room_code).cloned())
    }

    fn create_room(&self, mut room: RoomState) -> Result<RoomState, SyncError> {
        self.ensure_online()?;
        {
            let mut rooms = self.inner.rooms.borrow_mut();
            if rooms.contains_key(&room.room_code) {
                return Err(SyncError::RoomExists(room.room_code));
            }
            room.stamp(0);
            rooms.insert(room.room_code.clone(), room.clone());
        }
        debug!("sync: created room {}", room.room_code);
        self.broadcast(&room);
        Ok(room)
    }

    fn transactional_update(
        &self,
        room_code: &str,
        update: &mut dyn FnMut(&RoomState) -> Result<RoomState, SyncError>,
    ) -> Result<RoomState, SyncError> {
        self.ensure_online()?;
        let committed = {
            let mut rooms = self.inner.rooms.borrow_mut();
            let current = rooms
                .get_mut(room_code)
                .ok_or_else(|| SyncError::RoomNotFound(room_code.to_owned()))?;

            let mut next = update(current)?;
            next.room_code = current.room_code.clone();
            next.stamp(current.revision);
            *current = next.clone();
            next
        };
        debug!("sync: room {} at revision {}", room_code, committed.revision);
        self.broadcast(&committed);
        Ok(committed)
    }

    fn subscribe(
        &self,
        room_code: &str,
        listener: RoomListener,
    ) -> Result<Subscription, SyncError> {
        self.ensure_online()?;
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);

        let key = Subscription {
            room_code: room_code.to_owned(),
            id,
        };
        self.inner.listeners.borrow_mut().push((key, listener));
        Ok(Subscription {
            room_code: room_code.to_owned(),
            id,
        })
    }

    fn unsubscribe(&self, subscription: Subscription) {
        self.inner
            .listeners
            .borrow_mut()
            .retain(|(key, _)| *key != subscription);
    }
}
