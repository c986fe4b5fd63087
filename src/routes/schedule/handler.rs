use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use super::model::{Schedule, ScheduleRequest, UpdateScheduleRequest};
use crate::AppState;
use crate::channel::RoomEvent;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct VersionQuery {
    pub version: i64,
}

#[axum::debug_handler]
pub async fn get_schedules(
    State(state): State<AppState>,
    Path((travel_id, day)): Path<(i64, i64)>,
) -> impl IntoResponse {
    Json(Schedule::find_by_day(&state.store, travel_id, day).await)
}

#[axum::debug_handler]
pub async fn create_schedule(
    State(state): State<AppState>,
    Path(travel_id): Path<i64>,
    Json(req): Json<ScheduleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let schedule = Schedule::create(&state.store, travel_id, req).await?;
    state.hub.publish(travel_id, RoomEvent::Updated);
    Ok((StatusCode::CREATED, Json(schedule)))
}

#[axum::debug_handler]
pub async fn update_schedule(
    State(state): State<AppState>,
    Path(schedule_id): Path<i64>,
    Json(req): Json<UpdateScheduleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let schedule = Schedule::update(&state.store, schedule_id, req).await?;
    state.hub.publish(schedule.travel_id, RoomEvent::Updated);
    Ok(Json(schedule))
}

#[axum::debug_handler]
pub async fn delete_schedule(
    State(state): State<AppState>,
    Path(schedule_id): Path<i64>,
    Query(query): Query<VersionQuery>,
) -> Result<impl IntoResponse, AppError> {
    let travel_id = Schedule::delete(&state.store, schedule_id, query.version).await?;
    state.hub.publish(travel_id, RoomEvent::Updated);
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn optimize_schedule(
    State(state): State<AppState>,
    Path((travel_id, day)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let moved = Schedule::optimize_day(&state.store, travel_id, day).await?;
    tracing::info!(
        "Route optimization completed for travel {} day {}: {} entries",
        travel_id,
        day,
        moved
    );
    state.hub.publish(travel_id, RoomEvent::ScheduleOptimized);
    Ok(StatusCode::NO_CONTENT)
}
