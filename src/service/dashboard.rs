//! Dashboard service
//!
//! Channel-owner views: aggregate statistics and the full video list.

use std::sync::Arc;

use crate::data::{ChannelStats, ChannelStatsQuery, Database, Video};
use crate::error::AppError;

/// Dashboard service
pub struct DashboardService {
    db: Arc<Database>,
}

impl DashboardService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Totals for the caller's channel; all zeros is a valid answer
    pub async fn stats(&self, channel_id: &str) -> Result<ChannelStats, AppError> {
        ChannelStatsQuery {
            channel_id: channel_id.to_string(),
        }
        .execute(&self.db)
        .await
    }

    /// Every video the caller owns, published or not
    pub async fn videos(&self, channel_id: &str) -> Result<Vec<Video>, AppError> {
        let videos = self.db.get_videos_by_owner(channel_id).await?;
        if videos.is_empty() {
            return Err(AppError::not_found("No videos found"));
        }
        Ok(videos)
    }
}
