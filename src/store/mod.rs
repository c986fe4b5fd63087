use std::collections::HashMap;

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::routes::chat::ChatMessage;
use crate::routes::item::Item;
use crate::routes::member::Member;
use crate::routes::notification::Notification;
use crate::routes::schedule::Schedule;
use crate::routes::travel::Travel;
use crate::routes::vote::Vote;

/// Authoritative in-process state for every travel room.
///
/// Clients never hold a write lock on any of this; they see only cached
/// projections refreshed by fetch or channel-driven invalidation. All
/// conflict decisions (accept-or-409) happen under this lock.
pub struct RoomStore {
    inner: RwLock<StoreInner>,
}

pub struct StoreInner {
    next_id: i64,
    pub travels: HashMap<i64, Travel>,
    pub members: HashMap<i64, Member>,
    pub items: HashMap<i64, Item>,
    pub schedules: HashMap<i64, Schedule>,
    pub votes: HashMap<i64, Vote>,
    /// (vote_id, voter email) -> selected option id. One ballot per pair.
    pub ballots: HashMap<(i64, String), i64>,
    /// Append-only chat history per travel, in server timestamp order.
    pub messages: HashMap<i64, Vec<ChatMessage>>,
    pub notifications: HashMap<i64, Notification>,
    /// Uploaded chat attachments: file id -> (file name, bytes).
    pub uploads: HashMap<String, (String, Vec<u8>)>,
}

impl StoreInner {
    pub fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Cascade removal of a travel and everything that references it.
    pub fn remove_travel(&mut self, travel_id: i64) {
        self.travels.remove(&travel_id);
        self.members.retain(|_, m| m.travel_id != travel_id);
        self.items.retain(|_, i| i.travel_id != travel_id);
        self.schedules.retain(|_, s| s.travel_id != travel_id);

        let vote_ids: Vec<i64> = self
            .votes
            .values()
            .filter(|v| v.travel_id == travel_id)
            .map(|v| v.id)
            .collect();
        self.votes.retain(|_, v| v.travel_id != travel_id);
        self.ballots
            .retain(|(vote_id, _), _| !vote_ids.contains(vote_id));

        self.messages.remove(&travel_id);
        self.notifications.retain(|_, n| n.travel_id != travel_id);
    }
}

impl RoomStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                next_id: 0,
                travels: HashMap::new(),
                members: HashMap::new(),
                items: HashMap::new(),
                schedules: HashMap::new(),
                votes: HashMap::new(),
                ballots: HashMap::new(),
                messages: HashMap::new(),
                notifications: HashMap::new(),
                uploads: HashMap::new(),
            }),
        }
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().await
    }
}

impl Default for RoomStore {
    fn default() -> Self {
        Self::new()
    }
}
