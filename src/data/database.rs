//! SQLite database operations
//!
//! All single-table reads and writes go through this module. Listing and
//! aggregation pipelines live in [`super::queries`], the toggle primitive
//! in [`super::toggle`].
//!
//! Writes with `RETURNING` are read with `fetch_all` so the statement runs
//! to completion, and commits, before the connection goes back to the pool.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use super::models::*;
use super::queries::{Page, PageRequest};
use crate::error::AppError;

/// Whether a write failed on a UNIQUE constraint
pub(crate) fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db_error) if db_error.is_unique_violation())
}

/// Database connection pool wrapper
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    // =========================================================================
    // Connection
    // =========================================================================

    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let connection_string = format!("sqlite:{}", path.display());
        let options = SqliteConnectOptions::from_str(&connection_string)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!(path = %path.display(), "Database connected and migrated successfully");

        Ok(Self { pool })
    }

    pub(crate) fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Insert a new user
    ///
    /// # Errors
    /// `Conflict` if the handle or email is already taken
    pub async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, user_name, email, full_name, password_hash, avatar_url, avatar_key,
                cover_image_url, cover_image_key, refresh_token, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.user_name)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.password_hash)
        .bind(&user.avatar_url)
        .bind(&user.avatar_key)
        .bind(&user.cover_image_url)
        .bind(&user.cover_image_key)
        .bind(&user.refresh_token)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("User with email or username already exists".to_string())
            } else {
                e.into()
            }
        })?;

        Ok(())
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    pub async fn get_user_by_user_name(&self, user_name: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_name = ?")
            .bind(user_name.trim().to_ascii_lowercase())
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Find a user by handle or email (either may be omitted)
    pub async fn find_user_by_login(
        &self,
        user_name: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE user_name = ? OR email = ? LIMIT 1",
        )
        .bind(user_name.map(|value| value.trim().to_ascii_lowercase()))
        .bind(email.map(|value| value.trim().to_ascii_lowercase()))
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Overwrite (or clear) the single stored refresh token
    pub async fn set_refresh_token(
        &self,
        user_id: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET refresh_token = ?, updated_at = ? WHERE id = ?")
            .bind(refresh_token)
            .bind(Utc::now())
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Replace the stored refresh token only if it still equals `expected`
    ///
    /// # Returns
    /// `true` if rotated, `false` if the token was already used or replaced.
    pub async fn rotate_refresh_token(
        &self,
        user_id: &str,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE users SET refresh_token = ?, updated_at = ? WHERE id = ? AND refresh_token = ?",
        )
        .bind(replacement)
        .bind(Utc::now())
        .bind(user_id)
        .bind(expected)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn update_password_hash(
        &self,
        user_id: &str,
        password_hash: &str,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(Utc::now())
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Update name and email, returning the updated row
    pub async fn update_account_details(
        &self,
        user_id: &str,
        full_name: &str,
        email: &str,
    ) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET full_name = ?, email = ?, updated_at = ? WHERE id = ? RETURNING *",
        )
        .bind(full_name)
        .bind(email)
        .bind(Utc::now())
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map(|mut rows| rows.pop())
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Email is already in use".to_string())
            } else {
                e.into()
            }
        })
    }

    pub async fn update_avatar(
        &self,
        user_id: &str,
        avatar_url: &str,
        avatar_key: &str,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET avatar_url = ?, avatar_key = ?, updated_at = ? WHERE id = ? RETURNING *",
        )
        .bind(avatar_url)
        .bind(avatar_key)
        .bind(Utc::now())
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?
        .pop();

        Ok(user)
    }

    pub async fn update_cover_image(
        &self,
        user_id: &str,
        cover_image_url: &str,
        cover_image_key: &str,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET cover_image_url = ?, cover_image_key = ?, updated_at = ?
            WHERE id = ? RETURNING *
            "#,
        )
        .bind(cover_image_url)
        .bind(cover_image_key)
        .bind(Utc::now())
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?
        .pop();

        Ok(user)
    }

    // =========================================================================
    // Videos
    // =========================================================================

    pub async fn insert_video(&self, video: &Video) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO videos (
                id, owner_id, title, description, video_url, video_key, thumbnail_url,
                thumbnail_key, duration, views, is_published, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&video.id)
        .bind(&video.owner_id)
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.video_url)
        .bind(&video.video_key)
        .bind(&video.thumbnail_url)
        .bind(&video.thumbnail_key)
        .bind(video.duration)
        .bind(video.views)
        .bind(video.is_published)
        .bind(video.created_at)
        .bind(video.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_video(&self, id: &str) -> Result<Option<Video>, AppError> {
        let video = sqlx::query_as::<_, Video>("SELECT * FROM videos WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(video)
    }

    pub async fn video_exists(&self, id: &str) -> Result<bool, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM videos WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }

    /// Update title/description and optionally swap the thumbnail
    pub async fn update_video_details(
        &self,
        id: &str,
        title: &str,
        description: &str,
        thumbnail: Option<(&str, &str)>,
    ) -> Result<Option<Video>, AppError> {
        let now = Utc::now();
        let video = match thumbnail {
            Some((thumbnail_url, thumbnail_key)) => {
                sqlx::query_as::<_, Video>(
                    r#"
                    UPDATE videos
                    SET title = ?, description = ?, thumbnail_url = ?, thumbnail_key = ?, updated_at = ?
                    WHERE id = ?
                    RETURNING *
                    "#,
                )
                .bind(title)
                .bind(description)
                .bind(thumbnail_url)
                .bind(thumbnail_key)
                .bind(now)
                .bind(id)
                .fetch_all(&self.pool)
                .await?
                .pop()
            }
            None => {
                sqlx::query_as::<_, Video>(
                    r#"
                    UPDATE videos SET title = ?, description = ?, updated_at = ?
                    WHERE id = ?
                    RETURNING *
                    "#,
                )
                .bind(title)
                .bind(description)
                .bind(now)
                .bind(id)
                .fetch_all(&self.pool)
                .await?
                .pop()
            }
        };

        Ok(video)
    }

    /// Flip `is_published` in a single statement
    pub async fn toggle_video_published(&self, id: &str) -> Result<Option<Video>, AppError> {
        let video = sqlx::query_as::<_, Video>(
            r#"
            UPDATE videos SET is_published = NOT is_published, updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .fetch_all(&self.pool)
        .await?
        .pop();

        Ok(video)
    }

    /// Delete a video and every row that points at it
    ///
    /// Comments, playlist entries and watch history cascade through foreign
    /// keys; likes are polymorphic and removed explicitly.
    pub async fn delete_video(&self, id: &str) -> Result<Option<Video>, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            DELETE FROM likes
            WHERE target_kind = 'comment'
              AND target_id IN (SELECT id FROM comments WHERE video_id = ?)
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM likes WHERE target_kind = 'video' AND target_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let video = sqlx::query_as::<_, Video>("DELETE FROM videos WHERE id = ? RETURNING *")
            .bind(id)
            .fetch_all(&mut *tx)
            .await?
            .pop();

        tx.commit().await?;

        Ok(video)
    }

    /// Count a view and move the video to the end of the viewer's history
    pub async fn record_view(&self, video_id: &str, viewer_id: Option<&str>) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE videos SET views = views + 1 WHERE id = ?")
            .bind(video_id)
            .execute(&mut *tx)
            .await?;

        if let Some(viewer_id) = viewer_id {
            sqlx::query("DELETE FROM watch_history WHERE user_id = ? AND video_id = ?")
                .bind(viewer_id)
                .bind(video_id)
                .execute(&mut *tx)
                .await?;

            sqlx::query(
                "INSERT INTO watch_history (user_id, video_id, watched_at) VALUES (?, ?, ?)",
            )
            .bind(viewer_id)
            .bind(video_id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// All videos owned by a channel, newest first
    pub async fn get_videos_by_owner(&self, owner_id: &str) -> Result<Vec<Video>, AppError> {
        let videos = sqlx::query_as::<_, Video>(
            "SELECT * FROM videos WHERE owner_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(videos)
    }

    /// Videos the user has liked, most recently liked first
    pub async fn get_liked_videos(&self, user_id: &str) -> Result<Vec<Video>, AppError> {
        let videos = sqlx::query_as::<_, Video>(
            r#"
            SELECT v.* FROM videos v
            INNER JOIN likes l ON l.target_kind = 'video' AND l.target_id = v.id
            WHERE l.liked_by = ? AND (v.is_published = 1 OR v.owner_id = l.liked_by)
            ORDER BY l.created_at DESC, l.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(videos)
    }

    // =========================================================================
    // Comments
    // =========================================================================

    pub async fn insert_comment(&self, comment: &Comment) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO comments (id, owner_id, video_id, content, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&comment.id)
        .bind(&comment.owner_id)
        .bind(&comment.video_id)
        .bind(&comment.content)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_comment(&self, id: &str) -> Result<Option<Comment>, AppError> {
        let comment = sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(comment)
    }

    pub async fn update_comment_content(
        &self,
        id: &str,
        content: &str,
    ) -> Result<Option<Comment>, AppError> {
        let comment = sqlx::query_as::<_, Comment>(
            "UPDATE comments SET content = ?, updated_at = ? WHERE id = ? RETURNING *",
        )
        .bind(content)
        .bind(Utc::now())
        .bind(id)
        .fetch_all(&self.pool)
        .await?
        .pop();

        Ok(comment)
    }

    pub async fn delete_comment(&self, id: &str) -> Result<Option<Comment>, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM likes WHERE target_kind = 'comment' AND target_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let comment = sqlx::query_as::<_, Comment>("DELETE FROM comments WHERE id = ? RETURNING *")
            .bind(id)
            .fetch_all(&mut *tx)
            .await?
            .pop();

        tx.commit().await?;
        Ok(comment)
    }

    // =========================================================================
    // Community posts
    // =========================================================================

    pub async fn insert_community_post(&self, post: &CommunityPost) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO community_posts (id, owner_id, content, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post.id)
        .bind(&post.owner_id)
        .bind(&post.content)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_community_post(&self, id: &str) -> Result<Option<CommunityPost>, AppError> {
        let post = sqlx::query_as::<_, CommunityPost>("SELECT * FROM community_posts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(post)
    }

    /// One page of a user's posts, newest first
    pub async fn get_community_posts_by_owner(
        &self,
        owner_id: &str,
        page: PageRequest,
    ) -> Result<Page<CommunityPost>, AppError> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM community_posts WHERE owner_id = ?")
                .bind(owner_id)
                .fetch_one(&self.pool)
                .await?;

        let items = sqlx::query_as::<_, CommunityPost>(
            r#"
            SELECT * FROM community_posts WHERE owner_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(owner_id)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let posts = Page {
            items,
            request: page,
            total,
        };

        Ok(posts)
    }

    pub async fn update_community_post_content(
        &self,
        id: &str,
        content: &str,
    ) -> Result<Option<CommunityPost>, AppError> {
        let post = sqlx::query_as::<_, CommunityPost>(
            "UPDATE community_posts SET content = ?, updated_at = ? WHERE id = ? RETURNING *",
        )
        .bind(content)
        .bind(Utc::now())
        .bind(id)
        .fetch_all(&self.pool)
        .await?
        .pop();

        Ok(post)
    }

    pub async fn delete_community_post(&self, id: &str) -> Result<Option<CommunityPost>, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM likes WHERE target_kind = 'community_post' AND target_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let post = sqlx::query_as::<_, CommunityPost>(
            "DELETE FROM community_posts WHERE id = ? RETURNING *",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?
        .pop();

        tx.commit().await?;
        Ok(post)
    }

    // =========================================================================
    // Likes
    // =========================================================================

    /// Whether the entity a like would point at exists
    pub async fn like_target_exists(&self, target: &LikeTarget) -> Result<bool, AppError> {
        let sql = match target {
            LikeTarget::Video(_) => "SELECT COUNT(*) FROM videos WHERE id = ?",
            LikeTarget::Comment(_) => "SELECT COUNT(*) FROM comments WHERE id = ?",
            LikeTarget::CommunityPost(_) => "SELECT COUNT(*) FROM community_posts WHERE id = ?",
        };
        let count: i64 = sqlx::query_scalar(sql)
            .bind(target.id())
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }

    pub async fn count_likes(&self, liked_by: &str, target: &LikeTarget) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM likes WHERE liked_by = ? AND target_kind = ? AND target_id = ?",
        )
        .bind(liked_by)
        .bind(target.kind())
        .bind(target.id())
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Users subscribed to a channel, oldest subscription first
    pub async fn get_channel_subscribers(
        &self,
        channel_id: &str,
    ) -> Result<Vec<OwnerSummary>, AppError> {
        let subscribers = sqlx::query_as::<_, OwnerSummary>(
            r#"
            SELECT u.id, u.full_name, u.user_name, u.email FROM users u
            INNER JOIN subscriptions s ON s.subscriber_id = u.id
            WHERE s.channel_id = ?
            ORDER BY s.created_at ASC, s.id ASC
            "#,
        )
        .bind(channel_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(subscribers)
    }

    /// Channels a user is subscribed to, oldest subscription first
    pub async fn get_subscribed_channels(
        &self,
        subscriber_id: &str,
    ) -> Result<Vec<OwnerSummary>, AppError> {
        let channels = sqlx::query_as::<_, OwnerSummary>(
            r#"
            SELECT u.id, u.full_name, u.user_name, u.email FROM users u
            INNER JOIN subscriptions s ON s.channel_id = u.id
            WHERE s.subscriber_id = ?
            ORDER BY s.created_at ASC, s.id ASC
            "#,
        )
        .bind(subscriber_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(channels)
    }

    pub async fn count_subscriptions(
        &self,
        subscriber_id: &str,
        channel_id: &str,
    ) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM subscriptions WHERE subscriber_id = ? AND channel_id = ?",
        )
        .bind(subscriber_id)
        .bind(channel_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    // =========================================================================
    // Playlists
    // =========================================================================

    pub async fn insert_playlist(&self, playlist: &Playlist) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO playlists (id, owner_id, name, description, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&playlist.id)
        .bind(&playlist.owner_id)
        .bind(&playlist.name)
        .bind(&playlist.description)
        .bind(playlist.created_at)
        .bind(playlist.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_playlist(&self, id: &str) -> Result<Option<Playlist>, AppError> {
        let playlist = sqlx::query_as::<_, Playlist>("SELECT * FROM playlists WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(playlist)
    }

    /// Videos in a playlist, in the order they were added
    pub async fn get_playlist_videos(&self, playlist_id: &str) -> Result<Vec<Video>, AppError> {
        let videos = sqlx::query_as::<_, Video>(
            r#"
            SELECT v.* FROM videos v
            INNER JOIN playlist_videos pv ON pv.video_id = v.id
            WHERE pv.playlist_id = ?
            ORDER BY pv.added_at ASC, v.id ASC
            "#,
        )
        .bind(playlist_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(videos)
    }

    /// One page of a user's playlists with member video IDs
    pub async fn get_playlists_by_owner(
        &self,
        owner_id: &str,
        page: PageRequest,
    ) -> Result<Page<PlaylistSummary>, AppError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM playlists WHERE owner_id = ?")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await?;

        let playlists = sqlx::query_as::<_, Playlist>(
            r#"
            SELECT * FROM playlists WHERE owner_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(owner_id)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let memberships = sqlx::query_as::<_, (String, String)>(
            r#"
            SELECT pv.playlist_id, pv.video_id FROM playlist_videos pv
            INNER JOIN playlists p ON p.id = pv.playlist_id
            WHERE p.owner_id = ?
            ORDER BY pv.added_at ASC, pv.video_id ASC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        let mut videos_by_playlist: HashMap<String, Vec<String>> = HashMap::new();
        for (playlist_id, video_id) in memberships {
            videos_by_playlist
                .entry(playlist_id)
                .or_default()
                .push(video_id);
        }

        let items = playlists
            .into_iter()
            .map(|playlist| {
                let videos = videos_by_playlist.remove(&playlist.id).unwrap_or_default();
                PlaylistSummary { playlist, videos }
            })
            .collect();

        Ok(Page {
            items,
            request: page,
            total,
        })
    }

    pub async fn update_playlist(
        &self,
        id: &str,
        name: &str,
        description: &str,
    ) -> Result<Option<Playlist>, AppError> {
        let playlist = sqlx::query_as::<_, Playlist>(
            "UPDATE playlists SET name = ?, description = ?, updated_at = ? WHERE id = ? RETURNING *",
        )
        .bind(name)
        .bind(description)
        .bind(Utc::now())
        .bind(id)
        .fetch_all(&self.pool)
        .await?
        .pop();

        Ok(playlist)
    }

    pub async fn delete_playlist(&self, id: &str) -> Result<Option<Playlist>, AppError> {
        let playlist = sqlx::query_as::<_, Playlist>("DELETE FROM playlists WHERE id = ? RETURNING *")
            .bind(id)
            .fetch_all(&self.pool)
            .await?
            .pop();

        Ok(playlist)
    }

    /// Add a video to a playlist (set semantics)
    ///
    /// # Returns
    /// `true` if added, `false` if the video was already present.
    pub async fn add_video_to_playlist(
        &self,
        playlist_id: &str,
        video_id: &str,
    ) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT OR IGNORE INTO playlist_videos (playlist_id, video_id, added_at) VALUES (?, ?, ?)",
        )
        .bind(playlist_id)
        .bind(video_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        touch_playlist(&mut tx, playlist_id).await?;
        tx.commit().await?;

        Ok(result.rows_affected() == 1)
    }

    /// Remove a video from a playlist
    ///
    /// # Returns
    /// `true` if removed, `false` if the video was not in the playlist.
    pub async fn remove_video_from_playlist(
        &self,
        playlist_id: &str,
        video_id: &str,
    ) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM playlist_videos WHERE playlist_id = ? AND video_id = ?")
            .bind(playlist_id)
            .bind(video_id)
            .execute(&mut *tx)
            .await?;

        touch_playlist(&mut tx, playlist_id).await?;
        tx.commit().await?;

        Ok(result.rows_affected() == 1)
    }
}

async fn touch_playlist(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    playlist_id: &str,
) -> Result<(), AppError> {
    let now: DateTime<Utc> = Utc::now();
    sqlx::query("UPDATE playlists SET updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(playlist_id)
        .execute(&mut **tx)
        .await?;

    Ok(())
}
