use axum::{
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::ClientFrame;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    travel_id: i64,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, query.travel_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, travel_id: i64) {
    info!("Channel connection opened for travel {}", travel_id);

    // Subscribed from the moment of upgrade; presence requires a separate
    // enter frame.
    let mut events = state.hub.subscribe(travel_id);
    let (mut ws_tx, mut ws_rx) = socket.split();

    let forward_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let json = match serde_json::to_string(&event) {
                        Ok(json) => json,
                        Err(e) => {
                            warn!("Failed to encode room event: {}", e);
                            continue;
                        }
                    };
                    if ws_tx.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                // A slow consumer missed events; the client recovers by
                // refetching, so just keep going from here.
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    debug!("Channel subscriber lagged by {} events", n);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let mut entered_as: Option<String> = None;

    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientFrame>(text.as_str()) {
                Ok(ClientFrame::Enter { username }) => {
                    debug!("{} entered travel {}", username, travel_id);
                    state.hub.enter(travel_id, &username);
                    entered_as = Some(username);
                }
                Err(e) => warn!("Unrecognized channel frame: {}", e),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Channel read error: {}", e);
                break;
            }
        }
    }

    forward_task.abort();
    if let Some(username) = entered_as {
        state.hub.leave(travel_id, &username);
    }
    info!("Channel connection closed for travel {}", travel_id);
}
