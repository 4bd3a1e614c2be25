//! Reading video durations with ffprobe

use std::path::Path;
use std::process::Command;

use async_trait::async_trait;

use super::MediaUpload;
use crate::error::AppError;

/// Reads the playing time of an uploaded video
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DurationReader: Send + Sync {
    /// Duration in seconds
    async fn duration(&self, video: &MediaUpload) -> Result<f64, AppError>;
}

/// Runs the `ffprobe` binary against a temporary copy of the upload
#[derive(Debug, Clone)]
pub struct Ffprobe {
    binary: String,
}

impl Default for Ffprobe {
    fn default() -> Self {
        Self {
            binary: "ffprobe".to_string(),
        }
    }
}

impl Ffprobe {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl DurationReader for Ffprobe {
    async fn duration(&self, video: &MediaUpload) -> Result<f64, AppError> {
        let file = tempfile::NamedTempFile::new()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("temp file failed: {}", e)))?;
        tokio::fs::write(file.path(), &video.data)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("temp file write failed: {}", e)))?;

        let binary = self.binary.clone();
        let output = tokio::task::spawn_blocking(move || {
            let output = run_ffprobe(&binary, file.path());
            drop(file);
            output
        })
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("ffprobe task failed: {}", e)))??;

        let json: serde_json::Value = serde_json::from_slice(&output)
            .map_err(|_| AppError::validation("Error extracting video duration"))?;
        parse_duration(&json)
    }
}

/// Raw JSON from ffprobe; a non-zero exit means the file is not media
fn run_ffprobe(binary: &str, input: &Path) -> Result<Vec<u8>, AppError> {
    let input = input
        .to_str()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("invalid temp path")))?;

    let output = Command::new(binary)
        .args(["-v", "quiet", "-print_format", "json", "-show_format", input])
        .output()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("ffprobe failed to start: {}", e)))?;

    if !output.status.success() {
        tracing::debug!(
            stderr = %String::from_utf8_lossy(&output.stderr),
            "ffprobe rejected upload"
        );
        return Err(AppError::validation("Error extracting video duration"));
    }

    Ok(output.stdout)
}

/// `format.duration` is a decimal string
fn parse_duration(json: &serde_json::Value) -> Result<f64, AppError> {
    json.get("format")
        .and_then(|format| format.get("duration"))
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|seconds| seconds.is_finite() && *seconds >= 0.0)
        .ok_or_else(|| AppError::validation("Error extracting video duration"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(data: &[u8]) -> MediaUpload {
        MediaUpload {
            file_name: Some("clip.mp4".to_string()),
            content_type: "video/mp4".to_string(),
            data: data.to_vec(),
        }
    }

    #[test]
    fn parses_format_duration() {
        let json = serde_json::json!({
            "format": { "format_name": "mov,mp4", "duration": "12.480000" }
        });

        assert_eq!(parse_duration(&json).unwrap(), 12.48);
    }

    #[test]
    fn missing_or_bad_duration_is_rejected() {
        for json in [
            serde_json::json!({}),
            serde_json::json!({ "format": {} }),
            serde_json::json!({ "format": { "duration": "N/A" } }),
            serde_json::json!({ "format": { "duration": "-1" } }),
        ] {
            assert!(matches!(parse_duration(&json), Err(AppError::Validation(_))));
        }
    }

    #[tokio::test]
    async fn missing_binary_is_a_server_error() {
        let reader = Ffprobe::new("/nonexistent/ffprobe");

        let err = reader.duration(&upload(b"not a video")).await.unwrap_err();

        assert!(matches!(err, AppError::Internal(_)));
    }
}
