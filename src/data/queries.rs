//! Listing and aggregation queries
//!
//! Each multi-step read is a named query object holding its validated
//! inputs. `execute` runs it against the pool and returns a typed result,
//! so handlers never assemble SQL themselves.

use std::collections::HashMap;

use serde::Serialize;
use sqlx::{QueryBuilder, Row, Sqlite};

use super::database::Database;
use super::models::*;
use crate::error::AppError;

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

// =============================================================================
// Pagination
// =============================================================================

/// Validated 1-based page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    /// Parse raw query-string values
    ///
    /// Missing values take the defaults (page 1, limit 10). Anything that
    /// is not a positive integer, or a limit above 100, is rejected.
    pub fn parse(page: Option<&str>, limit: Option<&str>) -> Result<Self, AppError> {
        fn positive(raw: Option<&str>, default: i64) -> Option<i64> {
            match raw.map(str::trim) {
                None => Some(default),
                Some(value) => value.parse::<i64>().ok().filter(|n| *n > 0),
            }
        }

        match (positive(page, DEFAULT_PAGE), positive(limit, DEFAULT_LIMIT)) {
            (Some(page), Some(limit)) if limit <= MAX_LIMIT => Ok(Self { page, limit }),
            _ => Err(AppError::validation("Invalid pagination parameters")),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn total_pages(&self, total: i64) -> i64 {
        (total + self.limit - 1) / self.limit
    }
}

/// One page of results plus the total match count
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub request: PageRequest,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> i64 {
        self.request.total_pages(self.total)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Escape `%`, `_` and `\` so user text matches literally inside LIKE
fn like_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for ch in search.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

// =============================================================================
// Video listing
// =============================================================================

/// Sortable video columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoSortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Title,
    Views,
    Duration,
}

impl VideoSortField {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw {
            "createdAt" => Ok(Self::CreatedAt),
            "updatedAt" => Ok(Self::UpdatedAt),
            "title" => Ok(Self::Title),
            "views" => Ok(Self::Views),
            "duration" => Ok(Self::Duration),
            _ => Err(AppError::validation("Invalid sortBy value")),
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "v.created_at",
            Self::UpdatedAt => "v.updated_at",
            Self::Title => "v.title",
            Self::Views => "v.views",
            Self::Duration => "v.duration",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(AppError::validation("Invalid sortType value")),
        }
    }

    fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Published videos (plus the viewer's own), filtered, sorted and paged
#[derive(Debug, Clone, Default)]
pub struct VideoListQuery {
    pub page: PageRequest,
    /// Case-insensitive substring of title or description
    pub search: Option<String>,
    pub sort_by: VideoSortField,
    pub sort_direction: SortDirection,
    /// Restrict to one channel
    pub owner_id: Option<String>,
    /// Authenticated caller; their unpublished videos are included
    pub viewer_id: Option<String>,
}

impl VideoListQuery {
    fn push_filters(&self, query_builder: &mut QueryBuilder<'_, Sqlite>) {
        query_builder.push(" WHERE (v.is_published = 1");
        if let Some(viewer_id) = &self.viewer_id {
            query_builder
                .push(" OR v.owner_id = ")
                .push_bind(viewer_id.clone());
        }
        query_builder.push(")");

        if let Some(owner_id) = &self.owner_id {
            query_builder
                .push(" AND v.owner_id = ")
                .push_bind(owner_id.clone());
        }

        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = like_pattern(search);
            query_builder
                .push(" AND (v.title LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR v.description LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
    }

    pub async fn execute(&self, db: &Database) -> Result<Page<Video>, AppError> {
        let mut count_builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM videos v");
        self.push_filters(&mut count_builder);
        let total = count_builder
            .build_query_scalar::<i64>()
            .fetch_one(db.pool())
            .await?;

        let mut query_builder = QueryBuilder::<Sqlite>::new("SELECT v.* FROM videos v");
        self.push_filters(&mut query_builder);
        let direction = self.sort_direction.sql();
        query_builder
            .push(format!(
                " ORDER BY {} {}, v.id {}",
                self.sort_by.column(),
                direction,
                direction
            ))
            .push(" LIMIT ")
            .push_bind(self.page.limit)
            .push(" OFFSET ")
            .push_bind(self.page.offset());

        let items = query_builder
            .build_query_as::<Video>()
            .fetch_all(db.pool())
            .await?;

        Ok(Page {
            items,
            request: self.page,
            total,
        })
    }
}

// =============================================================================
// Comments under a video
// =============================================================================

/// Comments joined to their owners, oldest first, paged after the join
#[derive(Debug, Clone)]
pub struct CommentPageQuery {
    pub video_id: String,
    pub page: PageRequest,
}

impl CommentPageQuery {
    pub async fn execute(&self, db: &Database) -> Result<Page<CommentView>, AppError> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM comments c
            INNER JOIN users u ON u.id = c.owner_id
            WHERE c.video_id = ?
            "#,
        )
        .bind(&self.video_id)
        .fetch_one(db.pool())
        .await?;

        let rows = sqlx::query(
            r#"
            SELECT c.id, c.content, c.created_at,
                   u.id AS owner_id, u.full_name, u.user_name, u.email
            FROM comments c
            INNER JOIN users u ON u.id = c.owner_id
            WHERE c.video_id = ?
            ORDER BY c.created_at ASC, c.id ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(&self.video_id)
        .bind(self.page.limit)
        .bind(self.page.offset())
        .fetch_all(db.pool())
        .await?;

        let items = rows
            .into_iter()
            .map(|row| {
                Ok(CommentView {
                    id: row.try_get("id")?,
                    content: row.try_get("content")?,
                    created_at: row.try_get("created_at")?,
                    owner: OwnerSummary {
                        id: row.try_get("owner_id")?,
                        full_name: row.try_get("full_name")?,
                        user_name: row.try_get("user_name")?,
                        email: row.try_get("email")?,
                    },
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        Ok(Page {
            items,
            request: self.page,
            total,
        })
    }
}

// =============================================================================
// Channel profile
// =============================================================================

/// Channel page by handle, with subscription counts for the caller
#[derive(Debug, Clone)]
pub struct ChannelProfileQuery {
    pub user_name: String,
    pub viewer_id: Option<String>,
}

impl ChannelProfileQuery {
    pub async fn execute(&self, db: &Database) -> Result<Option<ChannelProfile>, AppError> {
        let row = sqlx::query(
            r#"
            SELECT u.id, u.full_name, u.user_name, u.email, u.avatar_url,
                   u.cover_image_url, u.created_at,
                   (SELECT COUNT(*) FROM subscriptions WHERE channel_id = u.id)
                       AS subscribers_count,
                   (SELECT COUNT(*) FROM subscriptions WHERE subscriber_id = u.id)
                       AS channels_subscribed_to_count,
                   EXISTS (
                       SELECT 1 FROM subscriptions
                       WHERE channel_id = u.id AND subscriber_id = ?
                   ) AS is_subscribed
            FROM users u
            WHERE u.user_name = ?
            "#,
        )
        .bind(self.viewer_id.as_deref())
        .bind(self.user_name.trim().to_ascii_lowercase())
        .fetch_optional(db.pool())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(ChannelProfile {
            id: row.try_get("id")?,
            full_name: row.try_get("full_name")?,
            user_name: row.try_get("user_name")?,
            email: row.try_get("email")?,
            avatar: row.try_get("avatar_url")?,
            cover_image: row.try_get("cover_image_url")?,
            created_at: row.try_get("created_at")?,
            subscribers_count: row.try_get("subscribers_count")?,
            channels_subscribed_to_count: row.try_get("channels_subscribed_to_count")?,
            is_subscribed: row.try_get::<i64, _>("is_subscribed")? != 0,
        }))
    }
}

// =============================================================================
// Watch history
// =============================================================================

/// A user's watched videos in viewing order, each with its channel
#[derive(Debug, Clone)]
pub struct WatchHistoryQuery {
    pub user_id: String,
}

impl WatchHistoryQuery {
    pub async fn execute(
        &self,
        db: &Database,
    ) -> Result<Vec<VideoWithOwner<ChannelOwner>>, AppError> {
        let videos = sqlx::query_as::<_, Video>(
            r#"
            SELECT v.* FROM watch_history h
            INNER JOIN videos v ON v.id = h.video_id
            WHERE h.user_id = ? AND (v.is_published = 1 OR v.owner_id = h.user_id)
            ORDER BY h.position ASC
            "#,
        )
        .bind(&self.user_id)
        .fetch_all(db.pool())
        .await?;

        if videos.is_empty() {
            return Ok(Vec::new());
        }

        let mut owner_ids: Vec<String> = videos.iter().map(|v| v.owner_id.clone()).collect();
        owner_ids.sort_unstable();
        owner_ids.dedup();

        let mut query_builder = QueryBuilder::<Sqlite>::new(
            "SELECT id, full_name, user_name, avatar_url, cover_image_url FROM users WHERE id IN (",
        );
        {
            let mut separated = query_builder.separated(", ");
            for owner_id in &owner_ids {
                separated.push_bind(owner_id);
            }
        }
        query_builder.push(")");

        let owners: HashMap<String, ChannelOwner> = query_builder
            .build_query_as::<ChannelOwner>()
            .fetch_all(db.pool())
            .await?
            .into_iter()
            .map(|owner| (owner.id.clone(), owner))
            .collect();

        Ok(videos
            .into_iter()
            .filter_map(|video| {
                let owner = owners.get(&video.owner_id)?.clone();
                Some(VideoWithOwner::new(video, owner))
            })
            .collect())
    }
}

// =============================================================================
// Dashboard
// =============================================================================

/// Channel totals; every count is computed independently
#[derive(Debug, Clone)]
pub struct ChannelStatsQuery {
    pub channel_id: String,
}

impl ChannelStatsQuery {
    async fn count(&self, db: &Database, sql: &str) -> Result<i64, AppError> {
        let value: i64 = sqlx::query_scalar(sql)
            .bind(&self.channel_id)
            .fetch_one(db.pool())
            .await?;
        Ok(value)
    }

    pub async fn execute(&self, db: &Database) -> Result<ChannelStats, AppError> {
        let (
            total_videos,
            total_subscribers,
            total_video_likes,
            total_comment_likes,
            total_post_likes,
            total_views,
        ) = tokio::try_join!(
            self.count(db, "SELECT COUNT(*) FROM videos WHERE owner_id = ?"),
            self.count(db, "SELECT COUNT(*) FROM subscriptions WHERE channel_id = ?"),
            self.count(
                db,
                r#"
                SELECT COUNT(*) FROM likes l
                INNER JOIN videos v ON l.target_kind = 'video' AND l.target_id = v.id
                WHERE v.owner_id = ?
                "#,
            ),
            self.count(
                db,
                r#"
                SELECT COUNT(*) FROM likes l
                INNER JOIN comments c ON l.target_kind = 'comment' AND l.target_id = c.id
                WHERE c.owner_id = ?
                "#,
            ),
            self.count(
                db,
                r#"
                SELECT COUNT(*) FROM likes l
                INNER JOIN community_posts p
                    ON l.target_kind = 'community_post' AND l.target_id = p.id
                WHERE p.owner_id = ?
                "#,
            ),
            self.count(db, "SELECT COALESCE(SUM(views), 0) FROM videos WHERE owner_id = ?"),
        )?;

        Ok(ChannelStats {
            total_videos,
            total_subscribers,
            total_video_likes,
            total_comment_likes,
            total_post_likes,
            total_views,
        })
    }
}

/// Pagination block returned alongside listed items
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl<T> From<&Page<T>> for PaginationInfo {
    fn from(page: &Page<T>) -> Self {
        Self {
            page: page.request.page,
            limit: page.request.limit,
            total_pages: page.total_pages(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_defaults() {
        let request = PageRequest::parse(None, None).unwrap();
        assert_eq!(request, PageRequest { page: 1, limit: 10 });
        assert_eq!(request.offset(), 0);
    }

    #[test]
    fn page_request_rejects_bad_values() {
        for (page, limit) in [
            (Some("0"), None),
            (None, Some("0")),
            (Some("-1"), None),
            (Some("abc"), None),
            (None, Some("1.5")),
            (None, Some("101")),
        ] {
            let error = PageRequest::parse(page, limit).unwrap_err();
            assert!(
                matches!(&error, AppError::Validation(msg) if msg == "Invalid pagination parameters"),
                "page={:?} limit={:?}",
                page,
                limit
            );
        }
    }

    #[test]
    fn page_request_offset_and_total_pages() {
        let request = PageRequest::parse(Some("3"), Some("7")).unwrap();
        assert_eq!(request.offset(), 14);
        assert_eq!(request.total_pages(0), 0);
        assert_eq!(request.total_pages(7), 1);
        assert_eq!(request.total_pages(15), 3);
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn sort_parsing_is_whitelisted() {
        assert_eq!(VideoSortField::parse("views").unwrap(), VideoSortField::Views);
        assert!(VideoSortField::parse("password_hash").is_err());
        assert_eq!(SortDirection::parse("ASC").unwrap(), SortDirection::Asc);
        assert!(SortDirection::parse("sideways").is_err());
    }
}
