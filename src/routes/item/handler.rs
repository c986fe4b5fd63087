use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use super::model::{AddItemRequest, AssigneeRequest, CheckRequest, Item};
use crate::AppState;
use crate::channel::RoomEvent;
use crate::error::AppError;

#[axum::debug_handler]
pub async fn get_items(
    State(state): State<AppState>,
    Path(travel_id): Path<i64>,
) -> impl IntoResponse {
    Json(Item::find_by_travel(&state.store, travel_id).await)
}

#[axum::debug_handler]
pub async fn add_item(
    State(state): State<AppState>,
    Path(travel_id): Path<i64>,
    Json(req): Json<AddItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    let item = Item::create(&state.store, travel_id, req).await?;
    state.hub.publish(travel_id, RoomEvent::Updated);
    Ok((StatusCode::CREATED, Json(item)))
}

#[axum::debug_handler]
pub async fn toggle_check(
    State(state): State<AppState>,
    Path(item_id): Path<i64>,
    Json(req): Json<CheckRequest>,
) -> Result<impl IntoResponse, AppError> {
    let item = Item::toggle_check(&state.store, item_id, req).await?;
    state.hub.publish(item.travel_id, RoomEvent::Updated);
    Ok(Json(item))
}

#[axum::debug_handler]
pub async fn toggle_assignee(
    State(state): State<AppState>,
    Path(item_id): Path<i64>,
    Json(req): Json<AssigneeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let item = Item::toggle_assignee(&state.store, item_id, req).await?;
    state.hub.publish(item.travel_id, RoomEvent::Updated);
    Ok(Json(item))
}

#[axum::debug_handler]
pub async fn delete_item(
    State(state): State<AppState>,
    Path(item_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let travel_id = Item::delete(&state.store, item_id).await?;
    state.hub.publish(travel_id, RoomEvent::Updated);
    Ok(StatusCode::NO_CONTENT)
}
