use axum::{
    body::Bytes,
    extract::{Json, Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::Deserialize;

use super::model::{ChatMessage, SendMessageRequest};
use crate::AppState;
use crate::channel::RoomEvent;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub file_name: String,
}

#[axum::debug_handler]
pub async fn get_messages(
    State(state): State<AppState>,
    Path(travel_id): Path<i64>,
) -> impl IntoResponse {
    Json(ChatMessage::find_by_travel(&state.store, travel_id).await)
}

/// Persists the message, then broadcasts it to the room. The sender gets
/// the saved message back in the HTTP response as well, so clients have
/// to drop the echoed broadcast copy.
#[axum::debug_handler]
pub async fn send_message(
    State(state): State<AppState>,
    Path(travel_id): Path<i64>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let message = ChatMessage::create(&state.store, travel_id, req).await?;
    state.hub.publish(
        travel_id,
        RoomEvent::Chat {
            message: message.clone(),
        },
    );
    Ok((StatusCode::CREATED, Json(message)))
}

#[axum::debug_handler]
pub async fn upload_file(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let saved = ChatMessage::store_upload(
        &state.store,
        &query.file_name,
        body.to_vec(),
        state.config.max_upload_bytes,
    )
    .await?;
    tracing::info!("Stored chat upload {} ({} bytes)", saved.file_name, body.len());
    Ok((StatusCode::CREATED, Json(saved)))
}

#[axum::debug_handler]
pub async fn get_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (file_name, data) = ChatMessage::fetch_upload(&state.store, &file_id).await?;
    let headers = [
        (header::CONTENT_TYPE, "application/octet-stream".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file_name}\""),
        ),
    ];
    Ok((headers, data))
}
