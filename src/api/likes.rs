//! Like endpoints
//!
//! Each toggle answers 201 when a like was created and 200 when an
//! existing one was removed.

use axum::{
    Router,
    extract::{Path, State},
    routing::{get, post},
};

use super::response::ApiResponse;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::{EntityId, Like, LikeTarget, Toggled, Video};
use crate::error::AppError;
use crate::service::LikeService;

pub fn likes_router() -> Router<AppState> {
    Router::new()
        .route("/toggle/v/:videoId", post(toggle_video_like))
        .route("/toggle/c/:commentId", post(toggle_comment_like))
        .route("/toggle/t/:communityPostId", post(toggle_community_post_like))
        .route("/videos", get(liked_videos))
}

fn build_like_service(state: &AppState) -> LikeService {
    LikeService::new(state.db.clone())
}

async fn toggle_like(
    state: &AppState,
    liked_by: &str,
    target: LikeTarget,
    label: &str,
) -> Result<ApiResponse<Like>, AppError> {
    let toggled = build_like_service(state).toggle(liked_by, &target).await?;

    Ok(match toggled {
        Toggled::Added(like) => {
            ApiResponse::created(like, format!("{} liked successfully", label))
        }
        Toggled::Removed(like) => ApiResponse::ok(like, format!("{} unliked successfully", label)),
    })
}

/// POST /likes/toggle/v/:videoId
async fn toggle_video_like(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(video_id): Path<String>,
) -> Result<ApiResponse<Like>, AppError> {
    let video_id = EntityId::parse(&video_id, "video")?;
    toggle_like(&state, &user.id, LikeTarget::Video(video_id.0), "Video").await
}

/// POST /likes/toggle/c/:commentId
async fn toggle_comment_like(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(comment_id): Path<String>,
) -> Result<ApiResponse<Like>, AppError> {
    let comment_id = EntityId::parse(&comment_id, "comment")?;
    toggle_like(&state, &user.id, LikeTarget::Comment(comment_id.0), "Comment").await
}

/// POST /likes/toggle/t/:communityPostId
async fn toggle_community_post_like(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<String>,
) -> Result<ApiResponse<Like>, AppError> {
    let post_id = EntityId::parse(&post_id, "post")?;
    toggle_like(&state, &user.id, LikeTarget::CommunityPost(post_id.0), "Post").await
}

/// GET /likes/videos
async fn liked_videos(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<ApiResponse<Vec<Video>>, AppError> {
    let videos = build_like_service(&state).liked_videos(&user.id).await?;

    Ok(ApiResponse::ok(videos, "Liked videos fetched successfully"))
}
