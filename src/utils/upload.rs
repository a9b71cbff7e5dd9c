// src/utils/upload.rs

use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use crate::error::AppError;

/// Public URL prefix under which uploaded files are served.
pub const UPLOAD_URL_PREFIX: &str = "/uploads";

/// Disk-backed store for question images.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    /// Rejects anything that is not declared as an image or is over the ceiling.
    pub fn check(&self, content_type: Option<&str>, size: usize) -> Result<(), AppError> {
        if !content_type.is_some_and(|ct| ct.starts_with("image/")) {
            return Err(AppError::BadRequest("Only image files can be uploaded".to_string()));
        }
        if size > self.max_bytes {
            return Err(AppError::BadRequest(format!(
                "File size exceeds {}MB limit",
                self.max_bytes / (1024 * 1024)
            )));
        }
        Ok(())
    }

    /// Writes the image under a unique name and returns its public path.
    pub async fn save_image(
        &self,
        original_name: Option<&str>,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<String, AppError> {
        self.check(content_type, bytes.len())?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let file_name = unique_file_name(original_name);
        tokio::fs::write(self.dir.join(&file_name), bytes).await.map_err(|e| {
            tracing::error!("Failed to store upload {}: {:?}", file_name, e);
            AppError::from(e)
        })?;

        tracing::info!("Stored image upload {} ({} bytes)", file_name, bytes.len());
        Ok(format!("{UPLOAD_URL_PREFIX}/{file_name}"))
    }
}

/// `{millis}-{random}{.ext}`; the extension is kept only if it is short and alphanumeric.
fn unique_file_name(original_name: Option<&str>) -> String {
    let extension = original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default();

    format!(
        "{}-{}{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple(),
        extension
    )
}
