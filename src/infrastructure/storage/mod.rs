//! Media Storage
//!
//! Content-addressed image files on the local filesystem. The file name is
//! the SHA-256 of the bytes plus the sniffed extension, so identical uploads
//! share one file and stored files never change.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use crate::domain::{ImageFormat, MediaStorage};
use crate::shared::error::AppError;

/// Content-addressed file name for `bytes`.
pub fn content_file_name(bytes: &[u8], format: ImageFormat) -> String {
    let digest = Sha256::digest(bytes);
    format!("{:x}.{}", digest, format.extension())
}

/// Stores images under a root directory served at the media public path.
#[derive(Debug, Clone)]
pub struct LocalMediaStorage {
    root: PathBuf,
}

impl LocalMediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the root directory if needed.
    pub async fn init(&self) -> Result<(), AppError> {
        tokio::fs::create_dir_all(&self.root).await?;
        info!(root = %self.root.display(), "Media storage ready");
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl MediaStorage for LocalMediaStorage {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn store(&self, bytes: Vec<u8>, format: ImageFormat) -> Result<String, AppError> {
        let file_name = content_file_name(&bytes, format);
        let path = self.root.join(&file_name);

        if tokio::fs::try_exists(&path).await? {
            debug!(%file_name, "Image already stored");
            return Ok(file_name);
        }

        // Write under a unique name first so readers never see a partial file
        let tmp = self
            .root
            .join(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(%file_name, "Image stored");
        Ok(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("market-media-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_content_file_name_is_stable() {
        let a = content_file_name(b"same bytes", ImageFormat::Png);
        let b = content_file_name(b"same bytes", ImageFormat::Png);
        assert_eq!(a, b);
        assert!(a.ends_with(".png"));
        assert_eq!(a.len(), 64 + ".png".len());
        assert_ne!(a, content_file_name(b"other bytes", ImageFormat::Png));
    }

    #[tokio::test]
    async fn test_store_writes_once() {
        let storage = LocalMediaStorage::new(temp_root());
        assert_ok!(storage.init().await);

        let bytes = b"GIF89a-test-image".to_vec();
        let first = assert_ok!(storage.store(bytes.clone(), ImageFormat::Gif).await);
        let second = assert_ok!(storage.store(bytes.clone(), ImageFormat::Gif).await);
        assert_eq!(first, second);

        let on_disk = tokio::fs::read(storage.root().join(&first)).await.unwrap();
        assert_eq!(on_disk, bytes);

        tokio::fs::remove_dir_all(storage.root()).await.unwrap();
    }
}
