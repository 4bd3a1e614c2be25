//! Comment service

use std::sync::Arc;

use chrono::Utc;

use super::{ensure_owner, required_text};
use crate::data::{Comment, CommentPageQuery, CommentView, Database, EntityId, Page, PageRequest};
use crate::error::AppError;

/// Comment service
pub struct CommentService {
    db: Arc<Database>,
}

impl CommentService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    async fn ensure_video_exists(&self, video_id: &str) -> Result<(), AppError> {
        if self.db.video_exists(video_id).await? {
            Ok(())
        } else {
            Err(AppError::not_found("Video not found"))
        }
    }

    async fn owned_comment(&self, comment_id: &str, caller_id: &str) -> Result<Comment, AppError> {
        let comment = self
            .db
            .get_comment(comment_id)
            .await?
            .ok_or_else(|| AppError::not_found("Comment not found"))?;
        ensure_owner(&comment.owner_id, caller_id, "comment")?;
        Ok(comment)
    }

    /// Page through a video's comments, oldest first
    ///
    /// # Errors
    /// `NotFound` if the video is missing or the page holds no comments
    pub async fn list(
        &self,
        video_id: &str,
        page: PageRequest,
    ) -> Result<Page<CommentView>, AppError> {
        self.ensure_video_exists(video_id).await?;

        let comments = CommentPageQuery {
            video_id: video_id.to_string(),
            page,
        }
        .execute(&self.db)
        .await?;

        if comments.is_empty() {
            return Err(AppError::not_found("No comments found"));
        }
        Ok(comments)
    }

    pub async fn add(
        &self,
        owner_id: &str,
        video_id: &str,
        content: Option<String>,
    ) -> Result<Comment, AppError> {
        let content = required_text(content, "content")?;
        self.ensure_video_exists(video_id).await?;

        let now = Utc::now();
        let comment = Comment {
            id: EntityId::new().0,
            owner_id: owner_id.to_string(),
            video_id: video_id.to_string(),
            content,
            created_at: now,
            updated_at: now,
        };
        self.db.insert_comment(&comment).await?;

        tracing::info!(comment_id = %comment.id, video_id = %video_id, "Comment added");
        Ok(comment)
    }

    pub async fn update(
        &self,
        caller_id: &str,
        comment_id: &str,
        content: Option<String>,
    ) -> Result<Comment, AppError> {
        let content = required_text(content, "content")?;
        let comment = self.owned_comment(comment_id, caller_id).await?;

        self.db
            .update_comment_content(&comment.id, &content)
            .await?
            .ok_or_else(|| AppError::not_found("Comment not found"))
    }

    /// Delete a comment and the likes pointing at it
    pub async fn delete(&self, caller_id: &str, comment_id: &str) -> Result<Comment, AppError> {
        let comment = self.owned_comment(comment_id, caller_id).await?;

        let deleted = self
            .db
            .delete_comment(&comment.id)
            .await?
            .ok_or_else(|| AppError::not_found("Comment not found"))?;

        tracing::info!(comment_id = %deleted.id, "Comment deleted");
        Ok(deleted)
    }
}
