// src/handlers/upload.rs

use axum::{
    Extension, Json,
    extract::{Multipart, State},
    response::IntoResponse,
};
use serde_json::json;

use crate::{error::AppError, utils::jwt::Claims, utils::upload::UploadStore};

/// Multipart form field carrying the image.
const IMAGE_FIELD: &str = "image";

/// Stores one question image and returns its public path.
pub async fn upload_image(
    State(uploads): State<UploadStore>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::BadRequest("Invalid multipart data".to_string()))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        uploads.check(content_type.as_deref(), 0)?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|_| AppError::BadRequest("Failed to read file".to_string()))?
        {
            uploads.check(content_type.as_deref(), bytes.len() + chunk.len())?;
            bytes.extend_from_slice(&chunk);
        }

        let image_path = uploads
            .save_image(file_name.as_deref(), content_type.as_deref(), &bytes)
            .await?;
        tracing::info!("Teacher {} uploaded {}", claims.sub, image_path);

        return Ok(Json(json!({ "success": true, "imagePath": image_path })));
    }

    Err(AppError::BadRequest("No file was uploaded".to_string()))
}
