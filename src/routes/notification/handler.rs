use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use super::model::Notification;
use crate::AppState;
use crate::channel::RoomEvent;
use crate::error::AppError;

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub count: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct AcceptQuery {
    pub name: Option<String>,
}

#[axum::debug_handler]
pub async fn get_notifications(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> impl IntoResponse {
    Json(Notification::find_by_recipient(&state.store, &email).await)
}

#[axum::debug_handler]
pub async fn get_unread_count(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> impl IntoResponse {
    Json(UnreadCountResponse {
        count: Notification::unread_count(&state.store, &email).await,
    })
}

#[axum::debug_handler]
pub async fn mark_as_read(
    State(state): State<AppState>,
    Path(notification_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let notification = Notification::mark_as_read(&state.store, notification_id).await?;
    Ok(Json(notification))
}

#[axum::debug_handler]
pub async fn accept_invitation(
    State(state): State<AppState>,
    Path(notification_id): Path<i64>,
    Query(query): Query<AcceptQuery>,
) -> Result<impl IntoResponse, AppError> {
    let member = Notification::accept(&state.store, notification_id, query.name).await?;
    state.hub.publish(member.travel_id, RoomEvent::MemberJoined);
    Ok((StatusCode::CREATED, Json(member)))
}

#[axum::debug_handler]
pub async fn reject_invitation(
    State(state): State<AppState>,
    Path(notification_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Notification::reject(&state.store, notification_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
