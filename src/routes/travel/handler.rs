use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use super::model::{CreateTravelRequest, Travel, UpdateTravelRequest};
use crate::AppState;
use crate::channel::RoomEvent;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct JoinQuery {
    pub email: String,
    pub nickname: String,
}

#[axum::debug_handler]
pub async fn create_travel(
    State(state): State<AppState>,
    Json(req): Json<CreateTravelRequest>,
) -> Result<impl IntoResponse, AppError> {
    let travel = Travel::create(&state.store, req).await?;
    tracing::info!(
        "Travel created: id={}, title={}",
        travel.travel_id,
        travel.title
    );
    Ok((StatusCode::CREATED, Json(travel)))
}

#[axum::debug_handler]
pub async fn get_all_travels(State(state): State<AppState>) -> impl IntoResponse {
    Json(Travel::find_all(&state.store).await)
}

#[axum::debug_handler]
pub async fn get_my_travels(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> impl IntoResponse {
    Json(Travel::find_by_member_email(&state.store, &query.email).await)
}

#[axum::debug_handler]
pub async fn get_travel(
    State(state): State<AppState>,
    Path(travel_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(Travel::find_by_id(&state.store, travel_id).await?))
}

#[axum::debug_handler]
pub async fn get_by_invite_code(
    State(state): State<AppState>,
    Path(invite_code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(
        Travel::find_by_invite_code(&state.store, &invite_code).await?,
    ))
}

#[axum::debug_handler]
pub async fn join_travel(
    State(state): State<AppState>,
    Path(travel_id): Path<i64>,
    Query(query): Query<JoinQuery>,
) -> Result<impl IntoResponse, AppError> {
    let member = Travel::join(&state.store, travel_id, &query.email, &query.nickname).await?;
    state.hub.publish(travel_id, RoomEvent::MemberJoined);
    Ok((StatusCode::CREATED, Json(member)))
}

#[axum::debug_handler]
pub async fn update_travel(
    State(state): State<AppState>,
    Path(travel_id): Path<i64>,
    Json(req): Json<UpdateTravelRequest>,
) -> Result<impl IntoResponse, AppError> {
    let travel = Travel::update(&state.store, travel_id, req).await?;
    state.hub.publish(travel_id, RoomEvent::Updated);
    Ok(Json(travel))
}

#[axum::debug_handler]
pub async fn delete_travel(
    State(state): State<AppState>,
    Path(travel_id): Path<i64>,
    Query(query): Query<EmailQuery>,
) -> Result<impl IntoResponse, AppError> {
    Travel::delete(&state.store, travel_id, &query.email).await?;
    state.hub.drop_room(travel_id);
    tracing::info!("Travel deleted: id={}", travel_id);
    Ok(StatusCode::NO_CONTENT)
}
