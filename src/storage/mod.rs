//! Media storage module
//!
//! Handles:
//! - The `MediaStore` seam (R2 in production, in-memory or mocks in tests)
//! - Storage key layout per media kind
//! - Upload reservations that are released if the request fails later
//! - Reading video durations with ffprobe

mod media;
mod duration;
mod reservation;

use async_trait::async_trait;

pub use media::R2MediaStorage;
#[cfg(test)]
pub use duration::MockDurationReader;
pub use duration::{DurationReader, Ffprobe};
pub use reservation::{UploadReservation, delete_best_effort};

use crate::error::AppError;

/// A stored object: its bucket key and public URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    pub key: String,
    pub url: String,
}

/// A file received from a multipart request
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub file_name: Option<String>,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Object storage for uploaded media
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store `data` under `key`, returning its public location
    async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredMedia, AppError>;

    /// Delete the object at `key`; deleting a missing key succeeds
    async fn delete(&self, key: &str) -> Result<(), AppError>;
}

/// What an uploaded file is used for; decides its key prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Thumbnail,
    Avatar,
    CoverImage,
}

impl MediaKind {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Video => "videos",
            Self::Thumbnail => "thumbnails",
            Self::Avatar => "avatars",
            Self::CoverImage => "covers",
        }
    }

    /// Human-readable name used in validation messages
    pub fn label(self) -> &'static str {
        match self {
            Self::Video => "video file",
            Self::Thumbnail => "thumbnail",
            Self::Avatar => "avatar",
            Self::CoverImage => "cover image",
        }
    }

    /// File extension for an accepted content type
    fn extension(self, content_type: &str) -> Option<&'static str> {
        match self {
            Self::Video => match content_type {
                "video/mp4" => Some("mp4"),
                "video/webm" => Some("webm"),
                "video/quicktime" => Some("mov"),
                "video/x-matroska" => Some("mkv"),
                _ => None,
            },
            Self::Thumbnail | Self::Avatar | Self::CoverImage => match content_type {
                "image/jpeg" => Some("jpg"),
                "image/png" => Some("png"),
                "image/webp" => Some("webp"),
                "image/gif" => Some("gif"),
                _ => None,
            },
        }
    }

    /// Generate a fresh storage key for this kind
    ///
    /// # Errors
    /// `Validation` if the content type is not accepted for this kind
    pub fn new_key(self, content_type: &str) -> Result<String, AppError> {
        let ext = self.extension(content_type).ok_or_else(|| {
            AppError::Validation(format!("Unsupported {} type: {}", self.label(), content_type))
        })?;

        Ok(format!("{}/{}.{}", self.prefix(), ulid::Ulid::new(), ext))
    }
}

pub(crate) fn build_r2_http_client() -> aws_sdk_s3::config::SharedHttpClient {
    use aws_smithy_runtime::client::http::hyper_014::HyperClientBuilder;

    let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_only()
        .enable_http1()
        .enable_http2()
        .build();

    HyperClientBuilder::new().build(https_connector)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_prefixed_by_kind() {
        let key = MediaKind::Video.new_key("video/mp4").unwrap();
        assert!(key.starts_with("videos/"));
        assert!(key.ends_with(".mp4"));

        let key = MediaKind::CoverImage.new_key("image/png").unwrap();
        assert!(key.starts_with("covers/"));
    }

    #[test]
    fn kinds_reject_foreign_content_types() {
        let error = MediaKind::Avatar.new_key("video/mp4").unwrap_err();
        assert!(matches!(error, AppError::Validation(msg) if msg.contains("avatar")));
        assert!(MediaKind::Video.new_key("image/png").is_err());
    }

    #[test]
    fn keys_are_unique() {
        let first = MediaKind::Thumbnail.new_key("image/webp").unwrap();
        let second = MediaKind::Thumbnail.new_key("image/webp").unwrap();
        assert_ne!(first, second);
    }
}
