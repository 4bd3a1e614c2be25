//! Playlist service

use std::sync::Arc;

use chrono::Utc;

use super::{ensure_owner, required_text};
use crate::data::{
    Database, EntityId, Page, PageRequest, Playlist, PlaylistDetail, PlaylistSummary,
};
use crate::error::AppError;

/// Playlist service
pub struct PlaylistService {
    db: Arc<Database>,
}

impl PlaylistService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    async fn existing(&self, playlist_id: &str) -> Result<Playlist, AppError> {
        self.db
            .get_playlist(playlist_id)
            .await?
            .ok_or_else(|| AppError::not_found("Playlist not found"))
    }

    async fn owned(&self, playlist_id: &str, caller_id: &str) -> Result<Playlist, AppError> {
        let playlist = self.existing(playlist_id).await?;
        ensure_owner(&playlist.owner_id, caller_id, "playlist")?;
        Ok(playlist)
    }

    /// Resolve member videos, hiding other people's unpublished videos
    async fn detail(&self, playlist: Playlist, viewer_id: &str) -> Result<PlaylistDetail, AppError> {
        let videos = self
            .db
            .get_playlist_videos(&playlist.id)
            .await?
            .into_iter()
            .filter(|video| video.is_published || video.owner_id == viewer_id)
            .collect();

        Ok(PlaylistDetail { playlist, videos })
    }

    pub async fn create(
        &self,
        owner_id: &str,
        name: Option<String>,
        description: Option<String>,
    ) -> Result<Playlist, AppError> {
        let name = required_text(name, "name")?;
        let description = required_text(description, "description")?;

        let now = Utc::now();
        let playlist = Playlist {
            id: EntityId::new().0,
            owner_id: owner_id.to_string(),
            name,
            description,
            created_at: now,
            updated_at: now,
        };
        self.db.insert_playlist(&playlist).await?;

        tracing::info!(playlist_id = %playlist.id, owner_id = %owner_id, "Playlist created");
        Ok(playlist)
    }

    /// One page of a user's playlists with member IDs; 404 when the page is empty
    pub async fn list_by_user(
        &self,
        user_id: &str,
        page: PageRequest,
    ) -> Result<Page<PlaylistSummary>, AppError> {
        let playlists = self.db.get_playlists_by_owner(user_id, page).await?;
        if playlists.is_empty() {
            return Err(AppError::not_found("No playlists found"));
        }
        Ok(playlists)
    }

    pub async fn get(&self, playlist_id: &str, viewer_id: &str) -> Result<PlaylistDetail, AppError> {
        let playlist = self.existing(playlist_id).await?;
        self.detail(playlist, viewer_id).await
    }

    pub async fn update(
        &self,
        caller_id: &str,
        playlist_id: &str,
        name: Option<String>,
        description: Option<String>,
    ) -> Result<Playlist, AppError> {
        let name = required_text(name, "name")?;
        let description = required_text(description, "description")?;
        let playlist = self.owned(playlist_id, caller_id).await?;

        self.db
            .update_playlist(&playlist.id, &name, &description)
            .await?
            .ok_or_else(|| AppError::not_found("Playlist not found"))
    }

    pub async fn delete(&self, caller_id: &str, playlist_id: &str) -> Result<Playlist, AppError> {
        let playlist = self.owned(playlist_id, caller_id).await?;

        let deleted = self
            .db
            .delete_playlist(&playlist.id)
            .await?
            .ok_or_else(|| AppError::not_found("Playlist not found"))?;

        tracing::info!(playlist_id = %deleted.id, "Playlist deleted");
        Ok(deleted)
    }

    /// Add a video; adding one that is already present is a no-op
    pub async fn add_video(
        &self,
        caller_id: &str,
        video_id: &str,
        playlist_id: &str,
    ) -> Result<PlaylistDetail, AppError> {
        let playlist = self.owned(playlist_id, caller_id).await?;
        let video = self
            .db
            .get_video(video_id)
            .await?
            .ok_or_else(|| AppError::not_found("Video not found"))?;
        if !video.is_published && video.owner_id != caller_id {
            return Err(AppError::not_found("Video not found"));
        }

        let added = self.db.add_video_to_playlist(&playlist.id, &video.id).await?;
        tracing::debug!(playlist_id = %playlist.id, video_id = %video.id, added, "Playlist video added");

        let playlist = self.existing(&playlist.id).await?;
        self.detail(playlist, caller_id).await
    }

    /// Remove a video; removing one that is absent is a no-op
    pub async fn remove_video(
        &self,
        caller_id: &str,
        video_id: &str,
        playlist_id: &str,
    ) -> Result<PlaylistDetail, AppError> {
        let playlist = self.owned(playlist_id, caller_id).await?;

        let removed = self
            .db
            .remove_video_from_playlist(&playlist.id, video_id)
            .await?;
        tracing::debug!(playlist_id = %playlist.id, video_id = %video_id, removed, "Playlist video removed");

        let playlist = self.existing(&playlist.id).await?;
        self.detail(playlist, caller_id).await
    }
}
