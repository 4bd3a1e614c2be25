//! Upload reservations
//!
//! A reservation is an object that has been written to the store but not
//! yet referenced by any database row. Whoever holds it must either
//! `commit` (the row now owns the object) or `release` (delete it again).

use std::sync::Arc;

use super::{MediaKind, MediaStore, MediaUpload, StoredMedia};
use crate::error::AppError;
use crate::metrics::{MEDIA_BYTES_UPLOADED, MEDIA_CLEANUP_FAILURES_TOTAL, MEDIA_UPLOADS_TOTAL};

#[must_use = "an upload reservation must be committed or released"]
pub struct UploadReservation {
    store: Arc<dyn MediaStore>,
    media: StoredMedia,
}

impl UploadReservation {
    /// Upload a file under a fresh key for `kind`
    pub async fn upload(
        store: Arc<dyn MediaStore>,
        kind: MediaKind,
        upload: MediaUpload,
    ) -> Result<Self, AppError> {
        let key = kind.new_key(&upload.content_type)?;
        let size = upload.data.len() as u64;

        let media = store.upload(&key, upload.data, &upload.content_type).await?;

        MEDIA_UPLOADS_TOTAL.with_label_values(&[kind.prefix()]).inc();
        MEDIA_BYTES_UPLOADED.inc_by(size);
        tracing::debug!(key = %media.key, size, "Media uploaded");

        Ok(Self { store, media })
    }

    pub fn media(&self) -> &StoredMedia {
        &self.media
    }

    /// The object is now referenced by a persisted row
    pub fn commit(self) -> StoredMedia {
        self.media
    }

    /// Delete the uploaded object
    ///
    /// Failures are logged and counted, never returned, so the caller's
    /// original error is what reaches the client.
    pub async fn release(self) {
        delete_best_effort(self.store.as_ref(), &self.media.key).await;
    }
}

/// Delete an object, logging instead of failing
pub async fn delete_best_effort(store: &dyn MediaStore, key: &str) {
    if let Err(e) = store.delete(key).await {
        MEDIA_CLEANUP_FAILURES_TOTAL.inc();
        tracing::warn!(key = %key, error = %e, "Failed to delete media object");
    }
}
