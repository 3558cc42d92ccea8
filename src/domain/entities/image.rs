//! Image entity and repository trait.
//!
//! Maps to the `image_containers` and `images` tables. A container groups
//! the ordered images of one post or one complex chat message.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Image formats accepted for upload, detected from file content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageFormat {
    /// Detect the format from the leading magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(Self::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(Self::Gif)
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(Self::Webp)
        } else {
            None
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::Webp => "webp",
        }
    }
}

/// Represents a stored image.
///
/// Maps to the `images` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - container_id: BIGINT NOT NULL REFERENCES image_containers(id)
/// - position: INTEGER NOT NULL (order inside the container)
/// - file_name: TEXT NOT NULL (sha256 hex + extension)
/// - content_type: TEXT NOT NULL
/// - size_bytes: BIGINT NOT NULL
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    /// Snowflake ID (primary key)
    pub id: i64,

    pub container_id: i64,

    /// Zero-based order inside the container
    pub position: i32,

    /// Content-addressed file name under the media root
    pub file_name: String,

    pub content_type: String,

    pub size_bytes: i64,

    pub created_at: DateTime<Utc>,
}

/// Repository trait for Image data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageRepository: Send + Sync {
    /// Find an image inside a given container.
    async fn find_in_container(
        &self,
        container_id: i64,
        image_id: i64,
    ) -> Result<Option<Image>, AppError>;

    /// Count images currently in a container.
    async fn count_in_container(&self, container_id: i64) -> Result<i64, AppError>;

    /// Append images to an existing container, positions following the current last one.
    ///
    /// Fails with `BadRequest` when the container would hold more than `limit` images.
    async fn append(
        &self,
        container_id: i64,
        images: Vec<Image>,
        limit: usize,
    ) -> Result<Vec<Image>, AppError>;

    /// Delete an image row.
    async fn delete(&self, image_id: i64) -> Result<(), AppError>;
}

/// Blob storage for image bytes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Persist already-sniffed image bytes and return the stored file name.
    ///
    /// Identical content yields the same file name.
    async fn store(&self, bytes: Vec<u8>, format: ImageFormat) -> Result<String, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0], Some(ImageFormat::Png); "png")]
    #[test_case(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00], Some(ImageFormat::Jpeg); "jpeg")]
    #[test_case(b"GIF89a....", Some(ImageFormat::Gif); "gif")]
    #[test_case(b"RIFF\x10\x00\x00\x00WEBPVP8 ", Some(ImageFormat::Webp); "webp")]
    #[test_case(b"RIFF\x10\x00\x00\x00WAVE", None; "riff but not webp")]
    #[test_case(b"%PDF-1.7", None; "pdf")]
    #[test_case(b"", None; "empty")]
    fn test_sniff(bytes: &[u8], expected: Option<ImageFormat>) {
        assert_eq!(ImageFormat::sniff(bytes), expected);
    }

    #[test]
    fn test_format_metadata() {
        assert_eq!(ImageFormat::Jpeg.extension(), "jpg");
        assert_eq!(ImageFormat::Webp.content_type(), "image/webp");
    }
}
