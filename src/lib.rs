use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};

use channel::RoomHub;
use config::Config;
use store::RoomStore;

pub mod channel;
pub mod config;
pub mod error;
pub mod middleware;
pub mod store;
pub mod sync;
pub mod utils;

pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RoomStore>,
    pub hub: Arc<RoomHub>,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            store: Arc::new(RoomStore::new()),
            hub: Arc::new(RoomHub::new(config.channel_capacity)),
            config,
        }
    }
}

/// Assembles the full API router. Split out of `main` so the integration
/// tests can serve the same app on an ephemeral port.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        // 여행 방
        .route("/travels", post(routes::travel::create_travel))
        .route("/travels", get(routes::travel::get_all_travels))
        .route("/travels/my", get(routes::travel::get_my_travels))
        .route("/travels/{travel_id}", get(routes::travel::get_travel))
        .route("/travels/{travel_id}", put(routes::travel::update_travel))
        .route("/travels/{travel_id}", delete(routes::travel::delete_travel))
        .route(
            "/travels/code/{invite_code}",
            get(routes::travel::get_by_invite_code),
        )
        .route("/travels/{travel_id}/join", post(routes::travel::join_travel))
        // 멤버
        .route("/members/{id}", get(routes::member::get_members))
        .route("/members/{id}", post(routes::member::add_member))
        .route(
            "/members/{id}/invite",
            post(routes::member::invite_member),
        )
        .route(
            "/members/{id}/online",
            patch(routes::member::toggle_online),
        )
        .route("/members/{id}", delete(routes::member::delete_member))
        // 준비물
        .route("/items/{id}", get(routes::item::get_items))
        .route("/items/{id}", post(routes::item::add_item))
        .route("/items/{id}/check", patch(routes::item::toggle_check))
        .route(
            "/items/{id}/assignee",
            patch(routes::item::toggle_assignee),
        )
        .route("/items/{id}", delete(routes::item::delete_item))
        // 일정
        .route(
            "/schedules/{id}/{day}",
            get(routes::schedule::get_schedules),
        )
        .route(
            "/schedules/{id}",
            post(routes::schedule::create_schedule),
        )
        .route(
            "/schedules/{id}",
            put(routes::schedule::update_schedule),
        )
        .route(
            "/schedules/{id}",
            delete(routes::schedule::delete_schedule),
        )
        .route(
            "/schedules/{id}/{day}/optimize",
            post(routes::schedule::optimize_schedule),
        )
        // 투표
        .route("/votes/{id}", get(routes::vote::get_votes))
        .route("/votes/{id}", post(routes::vote::create_vote))
        .route("/votes/cast/{option_id}", post(routes::vote::cast_vote))
        .route(
            "/votes/my-votes/{travel_id}",
            get(routes::vote::get_my_votes),
        )
        .route("/votes/{id}", delete(routes::vote::delete_vote))
        // 채팅
        .route("/chat/{travel_id}", get(routes::chat::get_messages))
        .route("/chat/{travel_id}", post(routes::chat::send_message))
        .route("/chat/upload", post(routes::chat::upload_file))
        .route("/chat/files/{file_id}", get(routes::chat::get_file))
        // 알림
        .route(
            "/notifications/{id}",
            get(routes::notification::get_notifications),
        )
        .route(
            "/notifications/{id}/unread-count",
            get(routes::notification::get_unread_count),
        )
        .route(
            "/notifications/{id}/read",
            patch(routes::notification::mark_as_read),
        )
        .route(
            "/notifications/{id}/accept",
            post(routes::notification::accept_invitation),
        )
        .route(
            "/notifications/{id}/reject",
            post(routes::notification::reject_invitation),
        );

    let router = Router::new()
        .nest("/api", api)
        .route("/ws", get(channel::ws::ws_handler))
        .layer(axum::middleware::from_fn(middleware::log_errors));

    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(tower_http::cors::CorsLayer::permissive())
    };

    router.with_state(state)
}
