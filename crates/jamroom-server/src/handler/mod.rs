use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use http::{Method, header};
use jamroom_core::RoomManager;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod error;
pub mod room_service;
pub mod view;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<RoomManager>,
}

impl AppState {
    pub fn new(manager: Arc<RoomManager>) -> Self {
        Self { manager }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    let api = Router::new()
        .route(
            "/rooms",
            get(room_service::list_rooms).post(room_service::create_room),
        )
        .route("/rooms/{name}", get(room_service::get_room))
        .route("/rooms/{name}/join", post(room_service::join_room))
        .route("/rooms/{name}/next", post(room_service::advance_track))
        .route("/rooms/{name}/queue", post(room_service::enqueue_tracks))
        .route("/search", get(room_service::search));

    Router::new()
        .nest("/api", api)
        .route("/health", get(room_service::health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
