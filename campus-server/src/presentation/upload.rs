use std::path::Path;

use actix_multipart::{Field, Multipart};
use chrono::Utc;
use futures_util::StreamExt as _;
use tracing::info;

use crate::domain::error::DomainError;

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Fields accepted by the create/update post endpoints.
pub struct PostForm {
    pub content: Option<String>,
    /// Relative path of the stored image, e.g. `/uploads/<file>`.
    pub image: Option<String>,
}

/// Reads a multipart payload with an optional `content` text field and an
/// optional single `image` attachment. The image is written under
/// `upload_dir` and only its relative path is carried forward.
pub async fn read_post_form(
    mut payload: Multipart,
    upload_dir: &str,
) -> Result<PostForm, DomainError> {
    let mut content = None;
    let mut image = None;

    while let Some(item) = payload.next().await {
        let mut field = item
            .map_err(|e| DomainError::Validation(format!("malformed multipart payload: {}", e)))?;

        let name = field.name().to_string();
        match name.as_str() {
            "content" => content = Some(read_text(&mut field).await?),
            "image" => image = Some(store_image(&mut field, upload_dir).await?),
            _ => {
                drain(&mut field).await?;
                info!(field = %name, "ignoring unknown multipart field");
            }
        }
    }

    Ok(PostForm { content, image })
}

async fn read_text(field: &mut Field) -> Result<String, DomainError> {
    let bytes = read_capped(field, MAX_IMAGE_BYTES).await?;
    String::from_utf8(bytes)
        .map_err(|_| DomainError::Validation("content must be valid UTF-8".to_string()))
}

async fn store_image(field: &mut Field, upload_dir: &str) -> Result<String, DomainError> {
    let file_name = field
        .content_disposition()
        .get_filename()
        .map(|s| s.to_string())
        .ok_or_else(|| DomainError::Validation("image field must be a file".to_string()))?;

    let content_type = field.content_type().map(|m| m.essence_str().to_string());
    if !allowed_image(&file_name, content_type.as_deref()) {
        return Err(DomainError::Validation(
            "only jpeg, jpg, png and gif images are allowed".to_string(),
        ));
    }

    let bytes = read_capped(field, MAX_IMAGE_BYTES).await?;

    let stored_name = format!("{}-{}", Utc::now().timestamp_millis(), sanitize(&file_name));
    let path = Path::new(upload_dir).join(&stored_name);
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| DomainError::Internal(format!("failed to store image: {}", e)))?;

    info!(file = %stored_name, size = bytes.len(), "image stored");
    Ok(format!("/uploads/{}", stored_name))
}

/// Collects a field while enforcing the size ceiling on the fly, so an
/// oversized upload is rejected without buffering it whole.
async fn read_capped(field: &mut Field, cap: usize) -> Result<Vec<u8>, DomainError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk =
            chunk.map_err(|e| DomainError::Validation(format!("failed to read upload: {}", e)))?;
        if bytes.len() + chunk.len() > cap {
            return Err(DomainError::Validation(format!(
                "upload exceeds the {} byte limit",
                cap
            )));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

async fn drain(field: &mut Field) -> Result<(), DomainError> {
    while let Some(chunk) = field.next().await {
        chunk.map_err(|e| DomainError::Validation(format!("failed to read upload: {}", e)))?;
    }
    Ok(())
}

/// Both the extension and the declared content type must be an allowed
/// image format.
fn allowed_image(file_name: &str, content_type: Option<&str>) -> bool {
    let ext_ok = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "jpeg" | "jpg" | "png" | "gif"))
        .unwrap_or(false);

    let mime_ok = matches!(
        content_type,
        Some("image/jpeg" | "image/jpg" | "image/png" | "image/gif")
    );

    ext_ok && mime_ok
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
