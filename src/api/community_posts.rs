//! Community post endpoints

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
use crate::data::{CommunityPost, EntityId, PageRequest, PaginationInfo};
use crate::error::AppError;
use crate::service::CommunityPostService;

pub fn community_posts_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_post))
        .route("/user/:userId", get(user_posts))
        .route("/:communityPostId", patch(update_post).delete(delete_post))
}

fn build_community_post_service(state: &AppState) -> CommunityPostService {
    CommunityPostService::new(state.db.clone())
}

#[derive(Debug, Deserialize)]
struct PostRequest {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PostPagination {
    #[serde(flatten)]
    info: PaginationInfo,
    total_posts: i64,
}

#[derive(Debug, Serialize)]
struct PostListResponse {
    posts: Vec<CommunityPost>,
    pagination: PostPagination,
}

/// POST /communityPosts
async fn create_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(req): AppJson<PostRequest>,
) -> Result<ApiResponse<CommunityPost>, AppError> {
    let post = build_community_post_service(&state)
        .create(&user.id, req.content)
        .await?;

    Ok(ApiResponse::created(post, "Post created successfully"))
}

/// GET /communityPosts/user/:userId
async fn user_posts(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(user_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<ApiResponse<PostListResponse>, AppError> {
    let user_id = EntityId::parse(&user_id, "user")?;
    let page = PageRequest::parse(
        params.get("page").map(String::as_str),
        params.get("limit").map(String::as_str),
    )?;

    let page = build_community_post_service(&state)
        .list_by_user(&user_id.0, page)
        .await?;

    let pagination = PostPagination {
        info: PaginationInfo::from(&page),
        total_posts: page.total,
    };

    Ok(ApiResponse::ok(
        PostListResponse {
            posts: page.items,
            pagination,
        },
        "Post fetched successfully",
    ))
}

/// PATCH /communityPosts/:communityPostId
async fn update_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<String>,
    AppJson(req): AppJson<PostRequest>,
) -> Result<ApiResponse<CommunityPost>, AppError> {
    let post_id = EntityId::parse(&post_id, "post")?;
    let post = build_community_post_service(&state)
        .update(&user.id, &post_id.0, req.content)
        .await?;

    Ok(ApiResponse::ok(post, "Post updated successfully"))
}

/// DELETE /communityPosts/:communityPostId
async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<String>,
) -> Result<ApiResponse<CommunityPost>, AppError> {
    let post_id = EntityId::parse(&post_id, "post")?;
    let post = build_community_post_service(&state)
        .delete(&user.id, &post_id.0)
        .await?;

    Ok(ApiResponse::ok(post, "Post deleted successfully"))
}
