//! Video service
//!
//! Publishing, editing and deleting videos together with their media
//! objects, plus listing and view tracking.

use std::sync::Arc;

use chrono::Utc;

use super::{ensure_owner, required_text};
use crate::data::{Database, EntityId, Page, Video, VideoListQuery};
use crate::error::AppError;
use crate::storage::{
    DurationReader, MediaKind, MediaStore, MediaUpload, UploadReservation, delete_best_effort,
};

/// Publish form
#[derive(Debug, Default)]
pub struct PublishVideoInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub video_file: Option<MediaUpload>,
    pub thumbnail: Option<MediaUpload>,
}

/// Edit form
#[derive(Debug, Default)]
pub struct UpdateVideoInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<MediaUpload>,
}

/// Video service
pub struct VideoService {
    db: Arc<Database>,
    media: Arc<dyn MediaStore>,
    durations: Arc<dyn DurationReader>,
}

impl VideoService {
    /// Create new video service
    pub fn new(
        db: Arc<Database>,
        media: Arc<dyn MediaStore>,
        durations: Arc<dyn DurationReader>,
    ) -> Self {
        Self { db, media, durations }
    }

    pub async fn list(&self, query: &VideoListQuery) -> Result<Page<Video>, AppError> {
        query.execute(&self.db).await
    }

    /// Load a video that exists and the caller may modify
    async fn owned_video(&self, video_id: &str, caller_id: &str) -> Result<Video, AppError> {
        let video = self
            .db
            .get_video(video_id)
            .await?
            .ok_or_else(|| AppError::not_found("Video not found"))?;
        ensure_owner(&video.owner_id, caller_id, "video")?;
        Ok(video)
    }

    /// Upload both media files and create the video
    ///
    /// The duration is read from the video file itself. Nothing is uploaded
    /// until the form is complete and the file reads as a video. Uploaded
    /// objects are released if the second upload or the insert fails.
    pub async fn publish(&self, owner_id: &str, input: PublishVideoInput) -> Result<Video, AppError> {
        let title = required_text(input.title, "title")?;
        let description = required_text(input.description, "description")?;
        let video_file = input
            .video_file
            .ok_or_else(|| AppError::validation("Video file is required"))?;
        let thumbnail = input
            .thumbnail
            .ok_or_else(|| AppError::validation("Thumbnail is required"))?;
        let duration = self.durations.duration(&video_file).await?;

        let video_file =
            UploadReservation::upload(self.media.clone(), MediaKind::Video, video_file).await?;
        let thumbnail =
            match UploadReservation::upload(self.media.clone(), MediaKind::Thumbnail, thumbnail)
                .await
            {
                Ok(thumbnail) => thumbnail,
                Err(e) => {
                    video_file.release().await;
                    return Err(e);
                }
            };

        let now = Utc::now();
        let video = Video {
            id: EntityId::new().0,
            owner_id: owner_id.to_string(),
            title,
            description,
            video_url: video_file.media().url.clone(),
            video_key: video_file.media().key.clone(),
            thumbnail_url: thumbnail.media().url.clone(),
            thumbnail_key: thumbnail.media().key.clone(),
            duration,
            views: 0,
            is_published: true,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.db.insert_video(&video).await {
            video_file.release().await;
            thumbnail.release().await;
            return Err(e);
        }
        video_file.commit();
        thumbnail.commit();

        tracing::info!(video_id = %video.id, owner_id = %owner_id, "Video published");
        Ok(video)
    }

    /// Fetch a video for display
    ///
    /// Unpublished videos are only visible to their owner. An authenticated
    /// view counts towards `views` and is appended to the viewer's history.
    pub async fn watch(&self, video_id: &str, viewer_id: Option<&str>) -> Result<Video, AppError> {
        let mut video = self
            .db
            .get_video(video_id)
            .await?
            .ok_or_else(|| AppError::not_found("Video not found"))?;

        if !video.is_published && viewer_id != Some(video.owner_id.as_str()) {
            return Err(AppError::not_found("Video not found"));
        }

        if let Some(viewer_id) = viewer_id {
            self.db.record_view(&video.id, Some(viewer_id)).await?;
            video.views += 1;
        }

        Ok(video)
    }

    /// Edit title/description and optionally replace the thumbnail
    pub async fn update(
        &self,
        caller_id: &str,
        video_id: &str,
        input: UpdateVideoInput,
    ) -> Result<Video, AppError> {
        let video = self.owned_video(video_id, caller_id).await?;
        let title = required_text(input.title, "title")?;
        let description = required_text(input.description, "description")?;

        let thumbnail = match input.thumbnail {
            Some(upload) => Some(
                UploadReservation::upload(self.media.clone(), MediaKind::Thumbnail, upload)
                    .await?,
            ),
            None => None,
        };

        let result = self
            .db
            .update_video_details(
                &video.id,
                &title,
                &description,
                thumbnail
                    .as_ref()
                    .map(|t| (t.media().url.as_str(), t.media().key.as_str())),
            )
            .await;

        let updated = match result {
            Ok(Some(updated)) => updated,
            failed => {
                if let Some(thumbnail) = thumbnail {
                    thumbnail.release().await;
                }
                return Err(match failed {
                    Err(e) => e,
                    Ok(_) => AppError::not_found("Video not found"),
                });
            }
        };

        if let Some(thumbnail) = thumbnail {
            thumbnail.commit();
            delete_best_effort(self.media.as_ref(), &video.thumbnail_key).await;
        }

        tracing::info!(video_id = %video.id, "Video updated");
        Ok(updated)
    }

    /// Delete a video and its media
    ///
    /// Both media objects are removed first; if either deletion fails the
    /// database row is left in place and the error is returned.
    pub async fn delete(&self, caller_id: &str, video_id: &str) -> Result<Video, AppError> {
        let video = self.owned_video(video_id, caller_id).await?;

        tokio::try_join!(
            self.media.delete(&video.video_key),
            self.media.delete(&video.thumbnail_key),
        )
        .inspect_err(|e| {
            tracing::error!(video_id = %video.id, error = %e, "Media deletion failed, keeping video");
        })?;

        let deleted = self
            .db
            .delete_video(&video.id)
            .await?
            .ok_or_else(|| AppError::not_found("Video not found"))?;

        tracing::info!(video_id = %deleted.id, "Video deleted");
        Ok(deleted)
    }

    pub async fn toggle_publish(&self, caller_id: &str, video_id: &str) -> Result<Video, AppError> {
        let video = self.owned_video(video_id, caller_id).await?;

        let toggled = self
            .db
            .toggle_video_published(&video.id)
            .await?
            .ok_or_else(|| AppError::not_found("Video not found"))?;

        tracing::info!(video_id = %toggled.id, is_published = toggled.is_published, "Publish state toggled");
        Ok(toggled)
    }
}
