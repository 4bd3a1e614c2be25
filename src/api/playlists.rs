//! Playlist endpoints

use std::collections::HashMap;

use axum::{
    Router,
    extract::{Path, Query, State},
    routing::{get, patch, post},
};
use serde::{Deserialize, Serialize};

use super::response::{ApiResponse, AppJson};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::{
    EntityId, PageRequest, PaginationInfo, Playlist, PlaylistDetail, PlaylistSummary,
};
use crate::error::AppError;
use crate::service::PlaylistService;

pub fn playlists_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_playlist))
        .route("/user/:userId", get(user_playlists))
        .route(
            "/:playlistId",
            get(get_playlist)
                .patch(update_playlist)
                .delete(delete_playlist),
        )
        .route("/add/:videoId/:playlistId", patch(add_video))
        .route("/remove/:videoId/:playlistId", patch(remove_video))
}

fn build_playlist_service(state: &AppState) -> PlaylistService {
    PlaylistService::new(state.db.clone())
}

#[derive(Debug, Deserialize)]
struct PlaylistRequest {
    name: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistPagination {
    #[serde(flatten)]
    info: PaginationInfo,
    total_playlists: i64,
}

#[derive(Debug, Serialize)]
struct PlaylistListResponse {
    playlists: Vec<PlaylistSummary>,
    pagination: PlaylistPagination,
}

/// POST /playlist
async fn create_playlist(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(req): AppJson<PlaylistRequest>,
) -> Result<ApiResponse<Playlist>, AppError> {
    let playlist = build_playlist_service(&state)
        .create(&user.id, req.name, req.description)
        .await?;

    Ok(ApiResponse::created(playlist, "Playlist created successfully"))
}

/// GET /playlist/user/:userId
async fn user_playlists(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(user_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<ApiResponse<PlaylistListResponse>, AppError> {
    let user_id = EntityId::parse(&user_id, "user")?;
    let page = PageRequest::parse(
        params.get("page").map(String::as_str),
        params.get("limit").map(String::as_str),
    )?;

    let page = build_playlist_service(&state)
        .list_by_user(&user_id.0, page)
        .await?;

    let pagination = PlaylistPagination {
        info: PaginationInfo::from(&page),
        total_playlists: page.total,
    };

    Ok(ApiResponse::ok(
        PlaylistListResponse {
            playlists: page.items,
            pagination,
        },
        "Playlists fetched successfully",
    ))
}

/// GET /playlist/:playlistId
async fn get_playlist(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(playlist_id): Path<String>,
) -> Result<ApiResponse<PlaylistDetail>, AppError> {
    let playlist_id = EntityId::parse(&playlist_id, "playlist")?;
    let playlist = build_playlist_service(&state)
        .get(&playlist_id.0, &user.id)
        .await?;

    Ok(ApiResponse::ok(playlist, "Playlist fetched successfully"))
}

/// PATCH /playlist/:playlistId
async fn update_playlist(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(playlist_id): Path<String>,
    AppJson(req): AppJson<PlaylistRequest>,
) -> Result<ApiResponse<Playlist>, AppError> {
    let playlist_id = EntityId::parse(&playlist_id, "playlist")?;
    let playlist = build_playlist_service(&state)
        .update(&user.id, &playlist_id.0, req.name, req.description)
        .await?;

    Ok(ApiResponse::ok(
        playlist,
        "Playlist details updated successfully",
    ))
}

/// DELETE /playlist/:playlistId
async fn delete_playlist(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(playlist_id): Path<String>,
) -> Result<ApiResponse<Playlist>, AppError> {
    let playlist_id = EntityId::parse(&playlist_id, "playlist")?;
    let playlist = build_playlist_service(&state)
        .delete(&user.id, &playlist_id.0)
        .await?;

    Ok(ApiResponse::ok(playlist, "Playlist deleted successfully"))
}

/// PATCH /playlist/add/:videoId/:playlistId
async fn add_video(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((video_id, playlist_id)): Path<(String, String)>,
) -> Result<ApiResponse<PlaylistDetail>, AppError> {
    let video_id = EntityId::parse(&video_id, "video")?;
    let playlist_id = EntityId::parse(&playlist_id, "playlist")?;
    let playlist = build_playlist_service(&state)
        .add_video(&user.id, &video_id.0, &playlist_id.0)
        .await?;

    Ok(ApiResponse::ok(
        playlist,
        "Video added to playlist successfully",
    ))
}

/// PATCH /playlist/remove/:videoId/:playlistId
async fn remove_video(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((video_id, playlist_id)): Path<(String, String)>,
) -> Result<ApiResponse<PlaylistDetail>, AppError> {
    let video_id = EntityId::parse(&video_id, "video")?;
    let playlist_id = EntityId::parse(&playlist_id, "playlist")?;
    let playlist = build_playlist_service(&state)
        .remove_video(&user.id, &video_id.0, &playlist_id.0)
        .await?;

    Ok(ApiResponse::ok(
        playlist,
        "Video removed from playlist successfully",
    ))
}
