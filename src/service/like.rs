//! Like service

use std::sync::Arc;

use crate::data::{Database, Like, LikeRelation, LikeTarget, Relation, Toggled, Video, toggle};
use crate::error::AppError;
use crate::metrics::TOGGLES_TOTAL;

/// Like service
pub struct LikeService {
    db: Arc<Database>,
}

impl LikeService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Like the target if the caller has not, unlike it otherwise
    ///
    /// # Errors
    /// `NotFound` if the target does not exist
    pub async fn toggle(&self, liked_by: &str, target: &LikeTarget) -> Result<Toggled<Like>, AppError> {
        if !self.db.like_target_exists(target).await? {
            let what = match target {
                LikeTarget::Video(_) => "Video",
                LikeTarget::Comment(_) => "Comment",
                LikeTarget::CommunityPost(_) => "Post",
            };
            return Err(AppError::NotFound(format!("{} not found", what)));
        }

        let toggled = toggle(&self.db, &LikeRelation { liked_by, target }).await?;

        TOGGLES_TOTAL
            .with_label_values(&[LikeRelation::NAME, toggled.outcome()])
            .inc();
        tracing::debug!(
            liked_by = %liked_by,
            target_kind = target.kind(),
            target_id = %target.id(),
            outcome = toggled.outcome(),
            "Like toggled"
        );

        Ok(toggled)
    }

    pub async fn liked_videos(&self, user_id: &str) -> Result<Vec<Video>, AppError> {
        self.db.get_liked_videos(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::EntityId;
    use crate::service::test_support::{create_test_db, create_user, create_video};

    #[tokio::test]
    async fn toggle_twice_restores_original_state() {
        let (db, _temp_dir) = create_test_db().await;
        let db = Arc::new(db);
        let alice = create_user(&db, "alice").await;
        let video = create_video(&db, &alice).await;
        let service = LikeService::new(db.clone());
        let target = LikeTarget::Video(video.id.clone());

        assert!(service.toggle(&alice.id, &target).await.unwrap().is_added());
        assert_eq!(service.liked_videos(&alice.id).await.unwrap().len(), 1);

        assert!(!service.toggle(&alice.id, &target).await.unwrap().is_added());
        assert!(service.liked_videos(&alice.id).await.unwrap().is_empty());
        assert_eq!(db.count_likes(&alice.id, &target).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_target_is_not_found() {
        let (db, _temp_dir) = create_test_db().await;
        let db = Arc::new(db);
        let alice = create_user(&db, "alice").await;
        let service = LikeService::new(db);

        let error = service
            .toggle(&alice.id, &LikeTarget::Comment(EntityId::new().0))
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::NotFound(msg) if msg == "Comment not found"));
    }
}
