//! Community post service

use std::sync::Arc;

use chrono::Utc;

use super::{ensure_owner, required_text};
use crate::data::{CommunityPost, Database, EntityId, Page, PageRequest};
use crate::error::AppError;

/// Community post service
pub struct CommunityPostService {
    db: Arc<Database>,
}

impl CommunityPostService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    async fn owned_post(&self, post_id: &str, caller_id: &str) -> Result<CommunityPost, AppError> {
        let post = self
            .db
            .get_community_post(post_id)
            .await?
            .ok_or_else(|| AppError::not_found("Post not found"))?;
        ensure_owner(&post.owner_id, caller_id, "post")?;
        Ok(post)
    }

    pub async fn create(
        &self,
        owner_id: &str,
        content: Option<String>,
    ) -> Result<CommunityPost, AppError> {
        let content = required_text(content, "content")?;

        let now = Utc::now();
        let post = CommunityPost {
            id: EntityId::new().0,
            owner_id: owner_id.to_string(),
            content,
            created_at: now,
            updated_at: now,
        };
        self.db.insert_community_post(&post).await?;

        tracing::info!(post_id = %post.id, owner_id = %owner_id, "Community post created");
        Ok(post)
    }

    /// One page of a user's posts, newest first; 404 when the page is empty
    pub async fn list_by_user(
        &self,
        user_id: &str,
        page: PageRequest,
    ) -> Result<Page<CommunityPost>, AppError> {
        let posts = self.db.get_community_posts_by_owner(user_id, page).await?;
        if posts.is_empty() {
            return Err(AppError::not_found("No posts found"));
        }
        Ok(posts)
    }

    pub async fn update(
        &self,
        caller_id: &str,
        post_id: &str,
        content: Option<String>,
    ) -> Result<CommunityPost, AppError> {
        let content = required_text(content, "content")?;
        let post = self.owned_post(post_id, caller_id).await?;

        self.db
            .update_community_post_content(&post.id, &content)
            .await?
            .ok_or_else(|| AppError::not_found("Post not found"))
    }

    pub async fn delete(&self, caller_id: &str, post_id: &str) -> Result<CommunityPost, AppError> {
        let post = self.owned_post(post_id, caller_id).await?;

        let deleted = self
            .db
            .delete_community_post(&post.id)
            .await?
            .ok_or_else(|| AppError::not_found("Post not found"))?;

        tracing::info!(post_id = %deleted.id, "Community post deleted");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::test_support::{create_test_db, create_user};

    #[tokio::test]
    async fn create_list_update_delete() {
        let (db, _temp_dir) = create_test_db().await;
        let db = Arc::new(db);
        let alice = create_user(&db, "alice").await;
        let bob = create_user(&db, "bob").await;
        let service = CommunityPostService::new(db);

        assert!(matches!(
            service.list_by_user(&alice.id, PageRequest::default()).await,
            Err(AppError::NotFound(_))
        ));

        let post = service
            .create(&alice.id, Some("  hello world ".to_string()))
            .await
            .unwrap();
        assert_eq!(post.content, "hello world");
        assert_eq!(service.list_by_user(&alice.id, PageRequest::default()).await.unwrap().total, 1);

        assert!(matches!(
            service.update(&bob.id, &post.id, Some("hijack".to_string())).await,
            Err(AppError::Forbidden(_))
        ));

        let updated = service
            .update(&alice.id, &post.id, Some("edited".to_string()))
            .await
            .unwrap();
        assert_eq!(updated.content, "edited");

        service.delete(&alice.id, &post.id).await.unwrap();
        assert!(matches!(
            service.list_by_user(&alice.id, PageRequest::default()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn blank_content_is_rejected() {
        let (db, _temp_dir) = create_test_db().await;
        let db = Arc::new(db);
        let alice = create_user(&db, "alice").await;
        let service = CommunityPostService::new(db);

        assert!(matches!(
            service.create(&alice.id, Some("   ".to_string())).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn listing_is_paged_newest_first() {
        let (db, _temp_dir) = create_test_db().await;
        let db = Arc::new(db);
        let alice = create_user(&db, "alice").await;
        let service = CommunityPostService::new(db);

        for content in ["first", "second", "third"] {
            service
                .create(&alice.id, Some(content.to_string()))
                .await
                .unwrap();
        }

        let page = service
            .list_by_user(&alice.id, PageRequest { page: 1, limit: 2 })
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages(), 2);
        assert_eq!(page.items.len(), 2);

        let last = service
            .list_by_user(&alice.id, PageRequest { page: 2, limit: 2 })
            .await
            .unwrap();
        assert_eq!(last.items.len(), 1);

        assert!(matches!(
            service
                .list_by_user(&alice.id, PageRequest { page: 3, limit: 2 })
                .await,
            Err(AppError::NotFound(_))
        ));
    }
}
