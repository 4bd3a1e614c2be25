//! TubeHub - A video hosting backend
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - /api/v1 resource endpoints                               │
//! │  - Success/failure envelopes, cookies, multipart            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Validation and ownership checks                          │
//! │  - Upload reservations and cleanup                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - SQLite (sqlx)                                            │
//! │  - Named listing/aggregation queries                        │
//! │  - R2 media storage                                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers and routing
//! - `service`: Business logic layer
//! - `data`: Database layer
//! - `storage`: Media object storage
//! - `auth`: Passwords, tokens and request extractors
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod service;
pub mod storage;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// This struct is cloned for each request; every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Media object storage
    pub media: Arc<dyn storage::MediaStore>,

    /// Reads uploaded video durations
    pub durations: Arc<dyn storage::DurationReader>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite database (runs migrations)
    /// 2. Build the R2 media store and the ffprobe duration reader
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        let media = storage::R2MediaStorage::new(&config.storage.media, &config.cloudflare);
        tracing::info!(bucket = %config.storage.media.bucket, "Media storage initialized");

        Self::with_backends(config, Arc::new(media), Arc::new(storage::Ffprobe::default())).await
    }

    /// Initialize with caller-supplied media store and duration reader
    pub async fn with_backends(
        config: config::AppConfig,
        media: Arc<dyn storage::MediaStore>,
        durations: Arc<dyn storage::DurationReader>,
    ) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let db = data::Database::connect(&config.database.path).await?;
        tracing::info!(path = %config.database.path.display(), "Database connected");

        Ok(Self {
            config: Arc::new(config),
            db: Arc::new(db),
            media,
            durations,
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use axum::extract::DefaultBodyLimit;
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    let cors_layer = build_cors_layer(&state.config.server);
    // Multipart overhead on top of the largest accepted file
    let body_limit = state
        .config
        .uploads
        .max_video_bytes
        .saturating_add(state.config.uploads.max_image_bytes)
        .saturating_add(64 * 1024);

    Router::new()
        .merge(api::api_router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
        .merge(api::metrics_router())
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::{HeaderValue, Method, header};
    use tower_http::cors::CorsLayer;

    let Some(allowed_origin) = server.cors_origin.as_deref() else {
        if !server.protocol.eq_ignore_ascii_case("https") {
            return CorsLayer::permissive();
        }
        return CorsLayer::new();
    };

    match HeaderValue::from_str(allowed_origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin([origin])
            .allow_credentials(true)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        Err(error) => {
            tracing::error!(
                %error,
                origin = %allowed_origin,
                "Failed to parse configured CORS origin; denying cross-origin requests"
            );
            CorsLayer::new()
        }
    }
}
