//! Image upload preparation shared by posts and complex chat messages.

use chrono::Utc;

use crate::config::MediaSettings;
use crate::domain::{Image, ImageFormat, MediaStorage};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// Raw bytes of one uploaded file; the client-declared content type is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }
}

/// Check every upload before anything is written.
pub fn inspect_uploads(
    uploads: &[ImageUpload],
    limits: &MediaSettings,
) -> Result<Vec<ImageFormat>, AppError> {
    uploads
        .iter()
        .enumerate()
        .map(|(index, upload)| {
            if upload.bytes.is_empty() {
                return Err(AppError::BadRequest(format!("File {} is empty", index + 1)));
            }
            if upload.bytes.len() > limits.max_image_bytes {
                return Err(AppError::PayloadTooLarge(format!(
                    "File {} exceeds {} bytes",
                    index + 1,
                    limits.max_image_bytes
                )));
            }
            ImageFormat::sniff(&upload.bytes).ok_or_else(|| {
                AppError::BadRequest(format!(
                    "File {} is not a supported image (png, jpeg, gif, webp)",
                    index + 1
                ))
            })
        })
        .collect()
}

/// Validate, store and describe uploads as images of `container_id`.
///
/// Positions start at `first_position`; the repository may renumber on insert.
pub async fn store_uploads<St: MediaStorage + ?Sized>(
    storage: &St,
    id_generator: &SnowflakeGenerator,
    limits: &MediaSettings,
    container_id: i64,
    first_position: i32,
    uploads: Vec<ImageUpload>,
) -> Result<Vec<Image>, AppError> {
    let formats = inspect_uploads(&uploads, limits)?;

    let mut images = Vec::with_capacity(uploads.len());
    for (offset, (upload, format)) in uploads.into_iter().zip(formats).enumerate() {
        let size_bytes = upload.bytes.len() as i64;
        let file_name = storage.store(upload.bytes, format).await?;
        images.push(Image {
            id: id_generator.generate(),
            container_id,
            position: first_position + offset as i32,
            file_name,
            content_type: format.content_type().to_string(),
            size_bytes,
            created_at: Utc::now(),
        });
    }

    Ok(images)
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// Smallest byte strings the sniffer accepts.
    pub const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    pub const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10];
}
