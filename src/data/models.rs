//! Data models
//!
//! Rust structs representing database rows and the joined projections
//! returned by the aggregation queries. All models use ULID for IDs and
//! chrono for timestamps. JSON field names follow the public API
//! (`_id`, camelCase).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, sqlite::SqliteRow};

use crate::error::AppError;

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// Parse a caller-supplied identifier
    ///
    /// Returns the canonical (uppercase) form, or a validation error
    /// naming `what` when the value is not a ULID.
    pub fn parse(raw: &str, what: &str) -> Result<Self, AppError> {
        ulid::Ulid::from_string(raw.trim())
            .map(|ulid| Self(ulid.to_string()))
            .map_err(|_| AppError::Validation(format!("Invalid {} id", what)))
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// User
// =============================================================================

/// A registered account (also a channel)
///
/// Secrets and storage keys are never serialized.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_name: String,
    pub email: String,
    pub full_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(rename = "avatar")]
    pub avatar_url: String,
    #[serde(skip_serializing)]
    pub avatar_key: String,
    #[serde(rename = "coverImage")]
    pub cover_image_url: Option<String>,
    #[serde(skip_serializing)]
    pub cover_image_key: Option<String>,
    /// Single active refresh token; replaced on every login/refresh
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public owner fields attached to comments, videos and subscription lists
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub full_name: String,
    pub user_name: String,
    pub email: String,
}

/// Channel fields attached to watch-history entries
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChannelOwner {
    #[serde(rename = "_id")]
    pub id: String,
    pub full_name: String,
    pub user_name: String,
    #[serde(rename = "avatar")]
    pub avatar_url: String,
    #[serde(rename = "coverImage")]
    pub cover_image_url: Option<String>,
}

// =============================================================================
// Video
// =============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "owner")]
    pub owner_id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "videoFile")]
    pub video_url: String,
    #[serde(skip_serializing)]
    pub video_key: String,
    #[serde(rename = "thumbnail")]
    pub thumbnail_url: String,
    #[serde(skip_serializing)]
    pub thumbnail_key: String,
    /// Duration in seconds
    pub duration: f64,
    pub views: i64,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A video with its owner resolved to a single projection
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoWithOwner<O> {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub video_file: String,
    pub thumbnail: String,
    pub duration: f64,
    pub views: i64,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner: O,
}

impl<O> VideoWithOwner<O> {
    pub fn new(video: Video, owner: O) -> Self {
        Self {
            id: video.id,
            title: video.title,
            description: video.description,
            video_file: video.video_url,
            thumbnail: video.thumbnail_url,
            duration: video.duration,
            views: video.views,
            is_published: video.is_published,
            created_at: video.created_at,
            updated_at: video.updated_at,
            owner,
        }
    }
}

// =============================================================================
// Comment
// =============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "owner")]
    pub owner_id: String,
    #[serde(rename = "video")]
    pub video_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Comment joined to its owner, as listed under a video
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    #[serde(rename = "_id")]
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub owner: OwnerSummary,
}

// =============================================================================
// Community post
// =============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CommunityPost {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "owner")]
    pub owner_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Likes
// =============================================================================

/// The single entity a like points at
///
/// Serializes as one of `{"video": id}`, `{"comment": id}` or
/// `{"communityPost": id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LikeTarget {
    Video(String),
    Comment(String),
    CommunityPost(String),
}

impl LikeTarget {
    /// Value stored in `likes.target_kind`
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Video(_) => "video",
            Self::Comment(_) => "comment",
            Self::CommunityPost(_) => "community_post",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Video(id) | Self::Comment(id) | Self::CommunityPost(id) => id,
        }
    }

    pub fn from_parts(kind: &str, id: String) -> Option<Self> {
        match kind {
            "video" => Some(Self::Video(id)),
            "comment" => Some(Self::Comment(id)),
            "community_post" => Some(Self::CommunityPost(id)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    #[serde(rename = "_id")]
    pub id: String,
    pub liked_by: String,
    #[serde(flatten)]
    pub target: LikeTarget,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for Like {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let kind: String = row.try_get("target_kind")?;
        let target_id: String = row.try_get("target_id")?;
        let target =
            LikeTarget::from_parts(&kind, target_id).ok_or_else(|| sqlx::Error::ColumnDecode {
                index: "target_kind".to_string(),
                source: format!("unknown like target kind: {}", kind).into(),
            })?;

        Ok(Self {
            id: row.try_get("id")?,
            liked_by: row.try_get("liked_by")?,
            target,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

// =============================================================================
// Subscription
// =============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "subscriber")]
    pub subscriber_id: String,
    #[serde(rename = "channel")]
    pub channel_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Playlist
// =============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "owner")]
    pub owner_id: String,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Playlist with its member video IDs
#[derive(Debug, Clone, Serialize)]
pub struct PlaylistSummary {
    #[serde(flatten)]
    pub playlist: Playlist,
    pub videos: Vec<String>,
}

/// Playlist with its member videos resolved
#[derive(Debug, Clone, Serialize)]
pub struct PlaylistDetail {
    #[serde(flatten)]
    pub playlist: Playlist,
    pub videos: Vec<Video>,
}

// =============================================================================
// Toggle outcome
// =============================================================================

/// Result of flipping a relation (like, subscription)
#[derive(Debug, Clone, PartialEq)]
pub enum Toggled<T> {
    /// The relation did not exist and now does
    Added(T),
    /// The relation existed and was deleted; carries the deleted record
    Removed(T),
}

impl<T> Toggled<T> {
    pub fn is_added(&self) -> bool {
        matches!(self, Self::Added(_))
    }

    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Added(_) => "added",
            Self::Removed(_) => "removed",
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Self::Added(record) | Self::Removed(record) => record,
        }
    }
}

// =============================================================================
// Aggregates
// =============================================================================

/// Channel page for a handle, from the caller's point of view
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub full_name: String,
    pub user_name: String,
    pub email: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub subscribers_count: i64,
    pub channels_subscribed_to_count: i64,
    pub is_subscribed: bool,
}

/// Dashboard totals for one channel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStats {
    pub total_videos: i64,
    pub total_subscribers: i64,
    pub total_video_likes: i64,
    pub total_comment_likes: i64,
    pub total_post_likes: i64,
    pub total_views: i64,
}
