use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use super::model::{CastOutcome, CreateVoteRequest, Vote};
use crate::AppState;
use crate::channel::RoomEvent;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct VoterQuery {
    pub user_email: String,
}

#[derive(Debug, Serialize)]
pub struct CastResponse {
    pub result: CastOutcome,
}

#[axum::debug_handler]
pub async fn get_votes(
    State(state): State<AppState>,
    Path(travel_id): Path<i64>,
) -> impl IntoResponse {
    Json(Vote::find_by_travel(&state.store, travel_id).await)
}

#[axum::debug_handler]
pub async fn create_vote(
    State(state): State<AppState>,
    Path(travel_id): Path<i64>,
    Json(req): Json<CreateVoteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let vote = Vote::create(&state.store, travel_id, req).await?;
    state.hub.publish(travel_id, RoomEvent::VoteUpdated);
    Ok((StatusCode::CREATED, Json(vote)))
}

#[axum::debug_handler]
pub async fn cast_vote(
    State(state): State<AppState>,
    Path(option_id): Path<i64>,
    Query(query): Query<VoterQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (result, travel_id) = Vote::cast(&state.store, option_id, &query.user_email).await?;
    state.hub.publish(travel_id, RoomEvent::VoteUpdated);
    Ok(Json(CastResponse { result }))
}

#[axum::debug_handler]
pub async fn get_my_votes(
    State(state): State<AppState>,
    Path(travel_id): Path<i64>,
    Query(query): Query<VoterQuery>,
) -> impl IntoResponse {
    Json(Vote::my_votes(&state.store, travel_id, &query.user_email).await)
}

#[axum::debug_handler]
pub async fn delete_vote(
    State(state): State<AppState>,
    Path(vote_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let travel_id = Vote::delete(&state.store, vote_id).await?;
    state.hub.publish(travel_id, RoomEvent::VoteUpdated);
    Ok(StatusCode::NO_CONTENT)
}
