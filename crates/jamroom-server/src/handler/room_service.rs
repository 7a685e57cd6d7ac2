use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::handler::AppState;
use crate::handler::error::ApiError;
use crate::handler::view::{RoomView, SearchResultsView};
use crate::util::{catalog_id, required_str};

const DEFAULT_SEARCH_LIMIT: u32 = 10;
const MAX_SEARCH_LIMIT: u32 = 50;

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct JoinRoomRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueTracksRequest {
    pub user_id: String,
    pub spotify_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
    pub limit: Option<u32>,
}

pub async fn list_rooms(State(state): State<AppState>) -> Json<Vec<RoomView>> {
    let rooms = state.manager.list_rooms();
    Json(rooms.iter().map(RoomView::from).collect())
}

pub async fn get_room(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<RoomView>, ApiError> {
    let room = state.manager.get_room(&name)?;
    Ok(Json(RoomView::from(&room)))
}

pub async fn create_room(
    State(state): State<AppState>,
    Json(req): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<RoomView>), ApiError> {
    required_str(&req.name, "Room name is required, but got empty string")?;
    let room = state.manager.create_room(&req.name)?;
    Ok((StatusCode::CREATED, Json(RoomView::from(&room))))
}

pub async fn join_room(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<JoinRoomRequest>,
) -> Result<Json<RoomView>, ApiError> {
    required_str(&req.email, "Email is required, but got empty string")?;
    tracing::info!(room = %name, "User try to join room");
    let room = state.manager.join_room(&name, &req.email)?;
    Ok(Json(RoomView::from(&room)))
}

pub async fn advance_track(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<RoomView>, ApiError> {
    let room = state.manager.advance_track(&name)?;
    Ok(Json(RoomView::from(&room)))
}

pub async fn enqueue_tracks(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<EnqueueTracksRequest>,
) -> Result<Json<RoomView>, ApiError> {
    required_str(&req.user_id, "User ID is required, but got empty string")?;
    if req.spotify_ids.is_empty() {
        return Err(ApiError::BadRequest("At least one track id is required"));
    }
    for id in &req.spotify_ids {
        catalog_id(id, "Track ids must be base62 Spotify ids or track URIs")?;
    }
    tracing::info!(room = %name, user_id = %req.user_id, count = req.spotify_ids.len(), "Enqueue requested");

    let room = state
        .manager
        .enqueue_tracks(&name, &req.user_id, &req.spotify_ids)
        .await?;
    Ok(Json(RoomView::from(&room)))
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResultsView>, ApiError> {
    required_str(&params.query, "Search query is required, but got empty string")?;
    let limit = params
        .limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_SEARCH_LIMIT);
    let results = state.manager.search(&params.query, limit).await?;
    Ok(Json(SearchResultsView::from(results)))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "status": "ok", "rooms": state.manager.len() }))
}
