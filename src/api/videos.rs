//! Video endpoints

use std::collections::HashMap;

use axum::{
    Router,
    extract::{Multipart, Path, Query, State, multipart::MultipartRejection},
    routing::{get, patch},
};
use serde::Serialize;

use super::multipart::MultipartForm;
use super::response::ApiResponse;
use crate::AppState;
use crate::auth::{CurrentUser, MaybeUser};
use crate::data::{
    EntityId, PageRequest, PaginationInfo, SortDirection, Video, VideoListQuery, VideoSortField,
};
use crate::error::AppError;
use crate::service::{PublishVideoInput, UpdateVideoInput, VideoService};

pub fn videos_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_videos).post(publish_video))
        .route(
            "/:videoId",
            get(get_video).patch(update_video).delete(delete_video),
        )
        .route("/toggle/publish/:videoId", patch(toggle_publish))
}

fn build_video_service(state: &AppState) -> VideoService {
    VideoService::new(state.db.clone(), state.media.clone(), state.durations.clone())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoPagination {
    #[serde(flatten)]
    info: PaginationInfo,
    total_videos: i64,
}

#[derive(Debug, Serialize)]
struct VideoListResponse {
    videos: Vec<Video>,
    pagination: VideoPagination,
}

fn list_query(
    params: &HashMap<String, String>,
    viewer_id: Option<&str>,
) -> Result<VideoListQuery, AppError> {
    let param = |name: &str| params.get(name).map(String::as_str);

    Ok(VideoListQuery {
        page: PageRequest::parse(param("page"), param("limit"))?,
        search: param("query")
            .map(str::trim)
            .filter(|query| !query.is_empty())
            .map(str::to_string),
        sort_by: param("sortBy")
            .map(VideoSortField::parse)
            .transpose()?
            .unwrap_or_default(),
        sort_direction: param("sortType")
            .map(SortDirection::parse)
            .transpose()?
            .unwrap_or_default(),
        owner_id: param("userId")
            .map(|raw| EntityId::parse(raw, "user").map(|id| id.0))
            .transpose()?,
        viewer_id: viewer_id.map(str::to_string),
    })
}

/// GET /videos
async fn list_videos(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Query(params): Query<HashMap<String, String>>,
) -> Result<ApiResponse<VideoListResponse>, AppError> {
    let query = list_query(&params, viewer.id())?;
    let page = build_video_service(&state).list(&query).await?;

    let pagination = VideoPagination {
        info: PaginationInfo::from(&page),
        total_videos: page.total,
    };

    Ok(ApiResponse::ok(
        VideoListResponse {
            videos: page.items,
            pagination,
        },
        "Videos fetched successfully",
    ))
}

/// POST /videos
async fn publish_video(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<Video>, AppError> {
    let limits = &state.config.uploads;
    let mut form = MultipartForm::read(
        multipart?,
        &[
            ("videoFile", limits.max_video_bytes),
            ("thumbnail", limits.max_image_bytes),
        ],
    )
    .await?;

    let input = PublishVideoInput {
        title: form.text("title"),
        description: form.text("description"),
        video_file: form.file("videoFile"),
        thumbnail: form.file("thumbnail"),
    };

    let video = build_video_service(&state).publish(&user.id, input).await?;
    Ok(ApiResponse::created(video, "Video Published Successfully"))
}

/// GET /videos/:videoId
async fn get_video(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(video_id): Path<String>,
) -> Result<ApiResponse<Video>, AppError> {
    let video_id = EntityId::parse(&video_id, "video")?;
    let video = build_video_service(&state)
        .watch(&video_id.0, viewer.id())
        .await?;

    Ok(ApiResponse::ok(video, "Video Fetched Successfully"))
}

/// PATCH /videos/:videoId
async fn update_video(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(video_id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<Video>, AppError> {
    let video_id = EntityId::parse(&video_id, "video")?;
    let mut form = MultipartForm::read(
        multipart?,
        &[("thumbnail", state.config.uploads.max_image_bytes)],
    )
    .await?;

    let input = UpdateVideoInput {
        title: form.text("title"),
        description: form.text("description"),
        thumbnail: form.file("thumbnail"),
    };

    let video = build_video_service(&state)
        .update(&user.id, &video_id.0, input)
        .await?;

    Ok(ApiResponse::ok(video, "Video Details Updated Successfully"))
}

/// DELETE /videos/:videoId
async fn delete_video(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(video_id): Path<String>,
) -> Result<ApiResponse<Video>, AppError> {
    let video_id = EntityId::parse(&video_id, "video")?;
    let video = build_video_service(&state)
        .delete(&user.id, &video_id.0)
        .await?;

    Ok(ApiResponse::ok(video, "Video Deleted Successfully"))
}

/// PATCH /videos/toggle/publish/:videoId
async fn toggle_publish(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(video_id): Path<String>,
) -> Result<ApiResponse<Video>, AppError> {
    let video_id = EntityId::parse(&video_id, "video")?;
    let video = build_video_service(&state)
        .toggle_publish(&user.id, &video_id.0)
        .await?;

    Ok(ApiResponse::ok(
        video,
        "Video publish status toggled successfully",
    ))
}
