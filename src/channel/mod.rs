use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::routes::chat::ChatMessage;

pub mod ws;

/// One event stream per travel room. Variants are decoded once at the
/// channel boundary; list-shaped consumers react by refetching, chat
/// carries its full payload, presence carries the full roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoomEvent {
    /// Something in the room's shared lists changed; refetch.
    Updated,
    MemberJoined,
    ScheduleOptimized,
    VoteUpdated,
    Chat { message: ChatMessage },
    Presence { users: Vec<String> },
}

/// Frames a client may send on the room socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// One-shot presence announcement. There is no explicit leave; the
    /// server derives departure from the transport disconnect.
    Enter { username: String },
}

struct RoomTopic {
    tx: broadcast::Sender<RoomEvent>,
    roster: BTreeSet<String>,
}

/// Per-room broadcast topics plus the live presence roster.
pub struct RoomHub {
    capacity: usize,
    rooms: Mutex<HashMap<i64, RoomTopic>>,
}

impl RoomHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            rooms: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<i64, RoomTopic>> {
        match self.rooms.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn subscribe(&self, travel_id: i64) -> broadcast::Receiver<RoomEvent> {
        let mut rooms = self.lock();
        let capacity = self.capacity;
        rooms
            .entry(travel_id)
            .or_insert_with(|| RoomTopic {
                tx: broadcast::channel(capacity).0,
                roster: BTreeSet::new(),
            })
            .tx
            .subscribe()
    }

    /// Publishes an event on the room topic. A room nobody subscribed to
    /// yet simply has no receivers; that is not an error.
    pub fn publish(&self, travel_id: i64, event: RoomEvent) {
        let rooms = self.lock();
        if let Some(topic) = rooms.get(&travel_id) {
            if topic.tx.send(event).is_err() {
                tracing::debug!("No live subscribers for travel {}", travel_id);
            }
        }
    }

    /// Adds a username to the roster and broadcasts the full new roster.
    pub fn enter(&self, travel_id: i64, username: &str) {
        let mut rooms = self.lock();
        let capacity = self.capacity;
        let topic = rooms.entry(travel_id).or_insert_with(|| RoomTopic {
            tx: broadcast::channel(capacity).0,
            roster: BTreeSet::new(),
        });
        topic.roster.insert(username.to_string());
        let users: Vec<String> = topic.roster.iter().cloned().collect();
        let _ = topic.tx.send(RoomEvent::Presence { users });
    }

    /// Removes a username on disconnect and rebroadcasts the roster.
    pub fn leave(&self, travel_id: i64, username: &str) {
        let mut rooms = self.lock();
        if let Some(topic) = rooms.get_mut(&travel_id) {
            if topic.roster.remove(username) {
                let users: Vec<String> = topic.roster.iter().cloned().collect();
                let _ = topic.tx.send(RoomEvent::Presence { users });
            }
        }
    }

    pub fn roster(&self, travel_id: i64) -> Vec<String> {
        let rooms = self.lock();
        rooms
            .get(&travel_id)
            .map(|t| t.roster.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Drops a room's topic entirely (travel deleted).
    pub fn drop_room(&self, travel_id: i64) {
        let mut rooms = self.lock();
        rooms.remove(&travel_id);
    }
}
