//! API layer
//!
//! HTTP handlers for:
//! - Users, channels and auth tokens
//! - Videos, comments, likes and playlists
//! - Subscriptions, community posts and the channel dashboard
//! - Metrics (Prometheus)

mod comments;
mod community_posts;
mod dashboard;
mod healthcheck;
mod likes;
pub mod metrics;
mod multipart;
mod playlists;
mod response;
mod subscriptions;
mod users;
mod videos;

use axum::{Router, middleware, routing::get};

use crate::AppState;

pub use metrics::metrics_router;
pub use response::{ApiResponse, AppJson};

/// Every resource router nested under `/api/v1`
pub fn api_router() -> Router<AppState> {
    let v1 = Router::new()
        .route("/healthcheck", get(healthcheck::healthcheck))
        .nest("/users", users::users_router())
        .nest("/videos", videos::videos_router())
        .nest("/comments", comments::comments_router())
        .nest("/likes", likes::likes_router())
        .nest("/subscriptions", subscriptions::subscriptions_router())
        .nest("/playlist", playlists::playlists_router())
        .nest("/communityPosts", community_posts::community_posts_router())
        .nest("/dashboard", dashboard::dashboard_router());

    Router::new()
        .nest("/api/v1", v1)
        .route_layer(middleware::from_fn(metrics::track_http_metrics))
}
