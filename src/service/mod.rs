//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services orchestrate database and media storage operations and enforce
//! ownership; handlers only parse input and shape responses.

mod comment;
mod community_post;
mod dashboard;
mod like;
mod playlist;
mod subscription;
mod user;
mod video;

pub use comment::CommentService;
pub use community_post::CommunityPostService;
pub use dashboard::DashboardService;
pub use like::LikeService;
pub use playlist::PlaylistService;
pub use subscription::SubscriptionService;
pub use user::{LoginInput, RegisterInput, UserService};
pub use video::{PublishVideoInput, UpdateVideoInput, VideoService};

use crate::error::AppError;

/// Trimmed, non-empty text or a 400 naming the field
pub(crate) fn required_text(value: Option<String>, field: &str) -> Result<String, AppError> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Validation(format!("{} is required", field)))
}

/// 403 unless the caller owns the resource
pub(crate) fn ensure_owner(owner_id: &str, caller_id: &str, what: &str) -> Result<(), AppError> {
    if owner_id == caller_id {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "You are not allowed to modify this {}",
            what
        )))
    }
}
