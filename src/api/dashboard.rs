//! Channel dashboard endpoints

use axum::{Router, extract::State, routing::get};

use super::response::ApiResponse;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::{ChannelStats, Video};
use crate::error::AppError;
use crate::service::DashboardService;

pub fn dashboard_router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(channel_stats))
        .route("/videos", get(channel_videos))
}

fn build_dashboard_service(state: &AppState) -> DashboardService {
    DashboardService::new(state.db.clone())
}

/// GET /dashboard/stats
async fn channel_stats(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<ApiResponse<ChannelStats>, AppError> {
    let stats = build_dashboard_service(&state).stats(&user.id).await?;

    Ok(ApiResponse::ok(stats, "Channel stats fetched successfully"))
}

/// GET /dashboard/videos
async fn channel_videos(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<ApiResponse<Vec<Video>>, AppError> {
    let videos = build_dashboard_service(&state).videos(&user.id).await?;

    Ok(ApiResponse::ok(videos, "Channel videos fetched successfully"))
}
