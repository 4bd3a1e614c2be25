//! Data layer module
//!
//! Handles all data persistence:
//! - SQLite database operations
//! - Listing and aggregation queries
//! - Idempotent relation toggles (likes, subscriptions)

mod database;
mod models;
mod queries;
mod toggle;

pub use database::Database;
pub use models::*;
pub use queries::{
    ChannelProfileQuery, ChannelStatsQuery, CommentPageQuery, Page, PageRequest, PaginationInfo,
    SortDirection, VideoListQuery, VideoSortField, WatchHistoryQuery,
};
pub use toggle::{LikeRelation, Relation, SubscriptionRelation, toggle};

#[cfg(test)]
mod database_test;
