//! Client-side synchronization core: the HTTP mutation path, the room
//! event channel with reconnect, and the small pieces of client state
//! that interpret what arrives on it.
//!
//! The server is always the arbiter. Nothing in this module applies a
//! write locally before the server accepted it; caches are refreshed by
//! refetching after a channel event, never by patching in place.

use std::time::Duration;

use thiserror::Error;

pub mod channel;
pub mod client;
pub mod dedup;
pub mod presence;
pub mod session;

pub use channel::{ChannelRegistry, ChannelState, RoomChannel};
pub use client::MutationClient;
pub use dedup::ChatLog;
pub use presence::PresenceTracker;
pub use session::SessionContext;

/// Errors surfaced by the sync layer. HTTP rejections keep the server's
/// message so the UI can show it verbatim.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Rejected before or by validation; nothing changed anywhere.
    #[error("{0}")]
    Validation(String),
    /// Owner-only action attempted by someone else.
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    /// A concurrent writer won; refetch and retry from fresh state.
    #[error("{0}")]
    Conflict(String),
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    /// Any other HTTP rejection.
    #[error("server returned {status}: {message}")]
    Http { status: u16, message: String },
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SyncError::Timeout
        } else {
            SyncError::Transport(err.to_string())
        }
    }
}

/// Where the sync layer talks to, and how patient it is.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// REST base, e.g. `http://127.0.0.1:8080/api`.
    pub base_url: String,
    /// Channel endpoint, e.g. `ws://127.0.0.1:8080/ws`.
    pub ws_url: String,
    pub request_timeout: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl SyncConfig {
    /// Config for a server on localhost, as used by the integration tests.
    pub fn local(port: u16) -> Self {
        Self {
            base_url: format!("http://127.0.0.1:{port}/api"),
            ws_url: format!("ws://127.0.0.1:{port}/ws"),
            request_timeout: Duration::from_secs(10),
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(30),
        }
    }
}
