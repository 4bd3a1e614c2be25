//! Multipart form parsing
//!
//! Text fields are collected by name. File fields are only accepted for
//! the names the caller lists, each with its own size cap, and are read
//! chunk by chunk so an oversized upload is rejected before it is buffered.

use std::collections::HashMap;

use axum::extract::Multipart;

use crate::error::AppError;
use crate::storage::MediaUpload;

#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, MediaUpload>,
}

impl MultipartForm {
    /// Read the whole form
    ///
    /// `file_limits` maps each accepted file field to its maximum size in
    /// bytes. Empty file parts are treated as absent.
    pub async fn read(
        mut multipart: Multipart,
        file_limits: &[(&str, usize)],
    ) -> Result<Self, AppError> {
        let mut form = Self::default();

        while let Some(mut field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            let Some(&(_, max_size)) = file_limits.iter().find(|(file, _)| *file == name) else {
                let text = field.text().await?;
                form.fields.insert(name, text);
                continue;
            };

            let file_name = field.file_name().map(str::to_string);
            let content_type = field
                .content_type()
                .map(str::to_string)
                .ok_or_else(|| AppError::Validation(format!("Missing content type for {}", name)))?;

            let mut data = Vec::new();
            while let Some(chunk) = field.chunk().await? {
                if data.len() + chunk.len() > max_size {
                    return Err(AppError::Validation(format!(
                        "File too large: {} exceeds {} bytes",
                        name, max_size
                    )));
                }
                data.extend_from_slice(&chunk);
            }

            if data.is_empty() {
                continue;
            }

            form.files.insert(
                name,
                MediaUpload {
                    file_name,
                    content_type,
                    data,
                },
            );
        }

        Ok(form)
    }

    pub fn text(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }

    pub fn file(&mut self, name: &str) -> Option<MediaUpload> {
        self.files.remove(name)
    }
}
