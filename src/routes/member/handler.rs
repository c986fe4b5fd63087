use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use super::model::{AddMemberRequest, InviteRequest, Member};
use crate::AppState;
use crate::channel::RoomEvent;
use crate::error::AppError;

#[axum::debug_handler]
pub async fn get_members(
    State(state): State<AppState>,
    Path(travel_id): Path<i64>,
) -> impl IntoResponse {
    Json(Member::find_by_travel(&state.store, travel_id).await)
}

#[axum::debug_handler]
pub async fn add_member(
    State(state): State<AppState>,
    Path(travel_id): Path<i64>,
    Json(req): Json<AddMemberRequest>,
) -> Result<impl IntoResponse, AppError> {
    let member = Member::create(&state.store, travel_id, req).await?;
    state.hub.publish(travel_id, RoomEvent::MemberJoined);
    Ok((StatusCode::CREATED, Json(member)))
}

#[axum::debug_handler]
pub async fn toggle_online(
    State(state): State<AppState>,
    Path(member_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let member = Member::toggle_online(&state.store, member_id).await?;
    state.hub.publish(member.travel_id, RoomEvent::Updated);
    Ok(Json(member))
}

#[axum::debug_handler]
pub async fn delete_member(
    State(state): State<AppState>,
    Path(member_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let travel_id = Member::delete(&state.store, member_id).await?;
    state.hub.publish(travel_id, RoomEvent::Updated);
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn invite_member(
    State(state): State<AppState>,
    Path(travel_id): Path<i64>,
    Json(req): Json<InviteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let notification = Member::invite(&state.store, travel_id, req).await?;
    tracing::info!(
        "Invitation sent to {} for travel {}",
        notification.recipient_email,
        travel_id
    );
    Ok((StatusCode::CREATED, Json(notification)))
}
