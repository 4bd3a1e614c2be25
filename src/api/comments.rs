//! Comment endpoints

use std::collections::HashMap;

use axum::{
    Router,
    extract::{Path, Query, State},
    routing::{get, patch},
};
use serde::{Deserialize, Serialize};

use super::response::{ApiResponse, AppJson};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::{Comment, CommentView, EntityId, PageRequest, PaginationInfo};
use crate::error::AppError;
use crate::service::CommentService;

pub fn comments_router() -> Router<AppState> {
    Router::new()
        .route("/:videoId", get(list_comments).post(add_comment))
        .route("/c/:commentId", patch(update_comment).delete(delete_comment))
}

fn build_comment_service(state: &AppState) -> CommentService {
    CommentService::new(state.db.clone())
}

#[derive(Debug, Deserialize)]
struct CommentRequest {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CommentPagination {
    #[serde(flatten)]
    info: PaginationInfo,
    total_comments: i64,
}

#[derive(Debug, Serialize)]
struct CommentListResponse {
    comments: Vec<CommentView>,
    pagination: CommentPagination,
}

/// GET /comments/:videoId
async fn list_comments(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(video_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<ApiResponse<CommentListResponse>, AppError> {
    let video_id = EntityId::parse(&video_id, "video")?;
    let page = PageRequest::parse(
        params.get("page").map(String::as_str),
        params.get("limit").map(String::as_str),
    )?;

    let page = build_comment_service(&state)
        .list(&video_id.0, page)
        .await?;

    let pagination = CommentPagination {
        info: PaginationInfo::from(&page),
        total_comments: page.total,
    };

    Ok(ApiResponse::ok(
        CommentListResponse {
            comments: page.items,
            pagination,
        },
        "Comments fetched successfully",
    ))
}

/// POST /comments/:videoId
async fn add_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(video_id): Path<String>,
    AppJson(req): AppJson<CommentRequest>,
) -> Result<ApiResponse<Comment>, AppError> {
    let video_id = EntityId::parse(&video_id, "video")?;
    let comment = build_comment_service(&state)
        .add(&user.id, &video_id.0, req.content)
        .await?;

    Ok(ApiResponse::created(comment, "Comment added successfully"))
}

/// PATCH /comments/c/:commentId
async fn update_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(comment_id): Path<String>,
    AppJson(req): AppJson<CommentRequest>,
) -> Result<ApiResponse<Comment>, AppError> {
    let comment_id = EntityId::parse(&comment_id, "comment")?;
    let comment = build_comment_service(&state)
        .update(&user.id, &comment_id.0, req.content)
        .await?;

    Ok(ApiResponse::ok(comment, "Comment updated successfully"))
}

/// DELETE /comments/c/:commentId
async fn delete_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(comment_id): Path<String>,
) -> Result<ApiResponse<Comment>, AppError> {
    let comment_id = EntityId::parse(&comment_id, "comment")?;
    let comment = build_comment_service(&state)
        .delete(&user.id, &comment_id.0)
        .await?;

    Ok(ApiResponse::ok(comment, "Comment deleted successfully"))
}
