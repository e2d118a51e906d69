//! Recipe images arrive as base64 data URIs and are stored as plain files
//! under `MEDIA_ROOT/recipes`, served back from `/media`.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::ApiError;

pub const MEDIA_URL: &str = "/media";
const RECIPE_IMAGE_DIR: &str = "recipes";
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

#[derive(Debug, PartialEq)]
pub struct DecodedImage {
    pub extension: String,
    pub bytes: Vec<u8>,
}

/// Parses `data:image/<ext>;base64,<payload>`.
pub fn decode_image(data: &str) -> Result<DecodedImage, ApiError> {
    let invalid = || ApiError::field("image", "Upload a valid image");

    let rest = data.trim().strip_prefix("data:image/").ok_or_else(invalid)?;
    let (extension, payload) = rest.split_once(";base64,").ok_or_else(invalid)?;
    let extension = extension.to_lowercase();

    if !IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        return Err(invalid());
    }

    let bytes = STANDARD.decode(payload).map_err(|_| invalid())?;
    if bytes.is_empty() {
        return Err(invalid());
    }

    Ok(DecodedImage { extension, bytes })
}

/// Writes the image and returns the URL it is served under.
pub async fn save_recipe_image(media_root: &Path, data: &str) -> Result<String, ApiError> {
    let image = decode_image(data)?;

    let directory = media_root.join(RECIPE_IMAGE_DIR);
    tokio::fs::create_dir_all(&directory)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to create media directory: {e}")))?;

    let filename = format!("{}.{}", uuid::Uuid::new_v4(), image.extension);
    tokio::fs::write(directory.join(&filename), &image.bytes)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to store image: {e}")))?;

    log::debug!("Stored recipe image {filename}");

    Ok(format!("{MEDIA_URL}/{RECIPE_IMAGE_DIR}/{filename}"))
}

/// Filesystem path of a URL produced by [`save_recipe_image`].
pub fn media_path(media_root: &Path, url: &str) -> Option<PathBuf> {
    let relative = url.strip_prefix(MEDIA_URL)?.strip_prefix('/')?;
    let filename = relative.strip_prefix(RECIPE_IMAGE_DIR)?.strip_prefix('/')?;

    if filename.is_empty() || filename.contains('/') || filename.contains("..") {
        return None;
    }

    Some(media_root.join(RECIPE_IMAGE_DIR).join(filename))
}

/// Best effort, a leftover file is only logged.
pub async fn remove_recipe_image(media_root: &Path, url: &str) {
    let Some(path) = media_path(media_root, url) else {
        return;
    };

    if let Err(e) = tokio::fs::remove_file(&path).await {
        log::warn!("Failed to remove {}: {e}", path.display());
    }
}
