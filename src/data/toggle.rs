//! Idempotent relation toggling
//!
//! A relation is a unique (actor, target) pair: a like or a subscription.
//! Toggling removes the pair if present and creates it otherwise. Both
//! halves are single statements backed by a UNIQUE constraint, so two
//! racing toggles can never produce a duplicate row, and a lost insert
//! race reports the pair as added instead of failing. Both statements are
//! drained with `fetch_all`, so a reported change is committed and visible
//! to the next reader.

use async_trait::async_trait;
use chrono::Utc;

use super::database::Database;
use super::models::*;
use crate::error::AppError;

/// A unique pair that can be flipped on and off
#[async_trait]
pub trait Relation: Send + Sync {
    type Record: Send;

    /// Metric label
    const NAME: &'static str;

    /// Delete the pair, returning the removed row
    async fn remove(&self, db: &Database) -> Result<Option<Self::Record>, AppError>;

    /// Insert the pair unless it exists, returning the new row
    async fn insert_if_absent(&self, db: &Database) -> Result<Option<Self::Record>, AppError>;

    async fn find(&self, db: &Database) -> Result<Option<Self::Record>, AppError>;
}

/// Flip a relation
///
/// # Errors
/// `Conflict` if a concurrent toggle removed the pair between our
/// conflicting insert and the follow-up read.
pub async fn toggle<R: Relation>(db: &Database, relation: &R) -> Result<Toggled<R::Record>, AppError> {
    if let Some(removed) = relation.remove(db).await? {
        return Ok(Toggled::Removed(removed));
    }

    if let Some(inserted) = relation.insert_if_absent(db).await? {
        return Ok(Toggled::Added(inserted));
    }

    // Another request inserted the same pair between our delete and insert.
    match relation.find(db).await? {
        Some(existing) => Ok(Toggled::Added(existing)),
        None => Err(AppError::Conflict(format!(
            "{} changed concurrently, try again",
            R::NAME
        ))),
    }
}

/// (liker, target) pair
pub struct LikeRelation<'a> {
    pub liked_by: &'a str,
    pub target: &'a LikeTarget,
}

#[async_trait]
impl Relation for LikeRelation<'_> {
    type Record = Like;
    const NAME: &'static str = "like";

    async fn remove(&self, db: &Database) -> Result<Option<Like>, AppError> {
        let like = sqlx::query_as::<_, Like>(
            r#"
            DELETE FROM likes
            WHERE liked_by = ? AND target_kind = ? AND target_id = ?
            RETURNING *
            "#,
        )
        .bind(self.liked_by)
        .bind(self.target.kind())
        .bind(self.target.id())
        .fetch_all(db.pool())
        .await?
        .pop();

        Ok(like)
    }

    async fn insert_if_absent(&self, db: &Database) -> Result<Option<Like>, AppError> {
        let now = Utc::now();
        let like = sqlx::query_as::<_, Like>(
            r#"
            INSERT INTO likes (id, liked_by, target_kind, target_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (liked_by, target_kind, target_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(EntityId::new().0)
        .bind(self.liked_by)
        .bind(self.target.kind())
        .bind(self.target.id())
        .bind(now)
        .bind(now)
        .fetch_all(db.pool())
        .await?
        .pop();

        Ok(like)
    }

    async fn find(&self, db: &Database) -> Result<Option<Like>, AppError> {
        let like = sqlx::query_as::<_, Like>(
            "SELECT * FROM likes WHERE liked_by = ? AND target_kind = ? AND target_id = ?",
        )
        .bind(self.liked_by)
        .bind(self.target.kind())
        .bind(self.target.id())
        .fetch_optional(db.pool())
        .await?;

        Ok(like)
    }
}

/// (subscriber, channel) pair
pub struct SubscriptionRelation<'a> {
    pub subscriber_id: &'a str,
    pub channel_id: &'a str,
}

#[async_trait]
impl Relation for SubscriptionRelation<'_> {
    type Record = Subscription;
    const NAME: &'static str = "subscription";

    async fn remove(&self, db: &Database) -> Result<Option<Subscription>, AppError> {
        let subscription = sqlx::query_as::<_, Subscription>(
            "DELETE FROM subscriptions WHERE subscriber_id = ? AND channel_id = ? RETURNING *",
        )
        .bind(self.subscriber_id)
        .bind(self.channel_id)
        .fetch_all(db.pool())
        .await?
        .pop();

        Ok(subscription)
    }

    async fn insert_if_absent(&self, db: &Database) -> Result<Option<Subscription>, AppError> {
        let now = Utc::now();
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions (id, subscriber_id, channel_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (subscriber_id, channel_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(EntityId::new().0)
        .bind(self.subscriber_id)
        .bind(self.channel_id)
        .bind(now)
        .bind(now)
        .fetch_all(db.pool())
        .await?
        .pop();

        Ok(subscription)
    }

    async fn find(&self, db: &Database) -> Result<Option<Subscription>, AppError> {
        let subscription = sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE subscriber_id = ? AND channel_id = ?",
        )
        .bind(self.subscriber_id)
        .bind(self.channel_id)
        .fetch_optional(db.pool())
        .await?;

        Ok(subscription)
    }
}
