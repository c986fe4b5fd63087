use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use super::SyncConfig;
use crate::channel::{ClientFrame, RoomEvent};

/// Capacity of the local fan-out buffer. A receiver that lags past this
/// gets `RecvError::Lagged` and should refetch, same as after reconnect.
const FANOUT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Connected,
    /// Waiting out a delay before the next connect attempt.
    Backoff,
    /// The channel was dropped; the driver is gone.
    Closed,
}

/// Exponential backoff between reconnect attempts. The returned base
/// delay doubles up to the cap; the driver adds jitter on top so two
/// tabs knocked off together do not reconnect in lockstep.
#[derive(Debug)]
struct Backoff {
    next: Duration,
    initial: Duration,
    max: Duration,
}

impl Backoff {
    fn new(initial: Duration, max: Duration) -> Self {
        Self {
            next: initial,
            initial,
            max,
        }
    }

    fn reset(&mut self) {
        self.next = self.initial;
    }

    fn delay(&mut self) -> Duration {
        let current = self.next;
        self.next = (self.next * 2).min(self.max);
        current
    }
}

fn jittered(base: Duration) -> Duration {
    let factor = rand::thread_rng().gen_range(0.8..1.2);
    base.mul_f64(factor)
}

struct Shared {
    travel_id: i64,
    events_tx: broadcast::Sender<RoomEvent>,
    state: Mutex<ChannelState>,
}

impl Shared {
    fn set_state(&self, state: ChannelState) {
        if let Ok(mut guard) = self.state.lock() {
            *guard = state;
        }
    }
}

/// A live subscription to one room's event stream.
///
/// Holding the channel keeps a background driver alive that connects,
/// announces presence, forwards every decoded event to local
/// subscribers, and reconnects with backoff when the transport drops.
/// Dropping the last handle tears the connection down; the server
/// derives the departure from the disconnect.
pub struct RoomChannel {
    shared: Arc<Shared>,
    driver: JoinHandle<()>,
}

impl RoomChannel {
    pub fn open(config: &SyncConfig, travel_id: i64, username: &str) -> Self {
        let shared = Arc::new(Shared {
            travel_id,
            events_tx: broadcast::channel(FANOUT_CAPACITY).0,
            state: Mutex::new(ChannelState::Connecting),
        });

        let driver = tokio::spawn(drive(
            Arc::downgrade(&shared),
            format!("{}?travel_id={}", config.ws_url, travel_id),
            username.to_string(),
            Backoff::new(config.initial_backoff, config.max_backoff),
        ));

        Self { shared, driver }
    }

    pub fn travel_id(&self) -> i64 {
        self.shared.travel_id
    }

    pub fn state(&self) -> ChannelState {
        self.shared
            .state
            .lock()
            .map(|s| *s)
            .unwrap_or(ChannelState::Closed)
    }

    /// A fresh receiver for the room's event stream. Events published
    /// before this call are not replayed; subscribe first, then fetch.
    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.shared.events_tx.subscribe()
    }
}

impl Drop for RoomChannel {
    fn drop(&mut self) {
        self.shared.set_state(ChannelState::Closed);
        self.driver.abort();
    }
}

/// Connect loop. Exits when the owning channel is gone.
async fn drive(shared: Weak<Shared>, url: String, username: String, mut backoff: Backoff) {
    loop {
        let Some(channel) = shared.upgrade() else {
            return;
        };
        channel.set_state(ChannelState::Connecting);
        let travel_id = channel.travel_id;
        drop(channel);

        match connect_async(url.as_str()).await {
            Ok((socket, _)) => {
                let Some(channel) = shared.upgrade() else {
                    return;
                };
                channel.set_state(ChannelState::Connected);
                backoff.reset();
                drop(channel);
                tracing::debug!("Channel connected for travel {}", travel_id);

                let (mut write, mut read) = socket.split();

                // Announce presence. Repeated after every reconnect so
                // the roster heals even if the server dropped us.
                let enter = ClientFrame::Enter {
                    username: username.clone(),
                };
                let frame = match serde_json::to_string(&enter) {
                    Ok(json) => json,
                    Err(err) => {
                        tracing::error!("Failed to encode enter frame: {}", err);
                        return;
                    }
                };
                if write.send(Message::Text(frame)).await.is_ok() {
                    while let Some(frame) = read.next().await {
                        match frame {
                            Ok(Message::Text(text)) => {
                                let event: RoomEvent = match serde_json::from_str(&text) {
                                    Ok(event) => event,
                                    Err(err) => {
                                        tracing::warn!("Undecodable room event: {}", err);
                                        continue;
                                    }
                                };
                                let Some(channel) = shared.upgrade() else {
                                    return;
                                };
                                // No local subscribers is fine; they may come back.
                                let _ = channel.events_tx.send(event);
                            }
                            Ok(Message::Close(_)) | Err(_) => break,
                            Ok(_) => {}
                        }
                    }
                }
                tracing::debug!("Channel disconnected for travel {}", travel_id);
            }
            Err(err) => {
                tracing::debug!("Channel connect failed for travel {}: {}", travel_id, err);
            }
        }

        let Some(channel) = shared.upgrade() else {
            return;
        };
        channel.set_state(ChannelState::Backoff);
        drop(channel);
        tokio::time::sleep(jittered(backoff.delay())).await;
    }
}

/// Hands out one shared [`RoomChannel`] per room.
///
/// Two screens watching the same room share a single connection; the
/// channel closes only when the last handle is dropped.
pub struct ChannelRegistry {
    config: SyncConfig,
    username: String,
    channels: Mutex<HashMap<i64, Weak<RoomChannel>>>,
}

impl ChannelRegistry {
    pub fn new(config: SyncConfig, username: impl Into<String>) -> Self {
        Self {
            config,
            username: username.into(),
            channels: Mutex::new(HashMap::new()),
        }
    }

    pub fn open(&self, travel_id: i64) -> Arc<RoomChannel> {
        let mut channels = match self.channels.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        channels.retain(|_, weak| weak.strong_count() > 0);

        if let Some(existing) = channels.get(&travel_id).and_then(Weak::upgrade) {
            return existing;
        }

        let channel = Arc::new(RoomChannel::open(&self.config, travel_id, &self.username));
        channels.insert(travel_id, Arc::downgrade(&channel));
        channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_to_the_cap_and_resets() {
        let mut b = Backoff::new(Duration::from_millis(250), Duration::from_secs(2));
        assert_eq!(b.delay(), Duration::from_millis(250));
        assert_eq!(b.delay(), Duration::from_millis(500));
        assert_eq!(b.delay(), Duration::from_millis(1000));
        assert_eq!(b.delay(), Duration::from_millis(2000));
        assert_eq!(b.delay(), Duration::from_millis(2000));

        b.reset();
        assert_eq!(b.delay(), Duration::from_millis(250));
    }

    #[test]
    fn jitter_stays_near_the_base() {
        for _ in 0..100 {
            let d = jittered(Duration::from_millis(1000));
            assert!(d >= Duration::from_millis(800));
            assert!(d < Duration::from_millis(1200));
        }
    }

    #[tokio::test]
    async fn registry_shares_one_channel_per_room() {
        // Nothing listens on this port; drivers just back off in the
        // background, which is all these assertions need.
        let registry = ChannelRegistry::new(SyncConfig::local(1), "지민");

        let a = registry.open(42);
        let b = registry.open(42);
        assert!(Arc::ptr_eq(&a, &b));

        let other = registry.open(43);
        assert!(!Arc::ptr_eq(&a, &other));
        assert_eq!(other.travel_id(), 43);
    }

    #[tokio::test]
    async fn dropping_every_handle_evicts_the_entry() {
        let registry = ChannelRegistry::new(SyncConfig::local(1), "지민");

        let first = registry.open(7);
        let again = registry.open(7);
        drop(first);
        drop(again);

        let fresh = registry.open(7);
        assert_ne!(fresh.state(), ChannelState::Closed);
        assert_eq!(fresh.travel_id(), 7);
    }
}
