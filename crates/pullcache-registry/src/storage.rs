//! Existence checks against the local registry's blob storage.
//!
//! Blobs are laid out the way the distribution registry stores them on a
//! filesystem driver:
//!
//! ```text
//! <root>/docker/registry/v2/blobs/<algorithm>/<first two hex>/<hex>/data
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::trace;

use pullcache_core::ContentDigest;

use crate::adapter::BlobExistence;
use crate::error::{RegistryError, Result};

/// Blob index over a filesystem storage root.
#[derive(Debug, Clone)]
pub struct StorageBlobIndex {
    root: PathBuf,
}

impl StorageBlobIndex {
    /// Creates an index rooted at the registry storage directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Storage root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the data file for a digest.
    ///
    /// # Examples
    ///
    /// ```
    /// use pullcache_core::ContentDigest;
    /// use pullcache_registry::StorageBlobIndex;
    ///
    /// let index = StorageBlobIndex::new("/storage");
    /// let digest = ContentDigest::sha256_of(b"");
    /// let path = index.blob_path(&digest);
    /// assert!(path.ends_with("e3/e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855/data"));
    /// ```
    #[must_use]
    pub fn blob_path(&self, digest: &ContentDigest) -> PathBuf {
        let encoded = digest.encoded();
        let prefix = encoded.get(..2).unwrap_or(encoded);
        self.root
            .join("docker/registry/v2/blobs")
            .join(digest.algorithm())
            .join(prefix)
            .join(encoded)
            .join("data")
    }
}

#[async_trait]
impl BlobExistence for StorageBlobIndex {
    async fn exists(&self, digest: &ContentDigest) -> Result<bool> {
        let path = self.blob_path(digest);
        match tokio::fs::metadata(&path).await {
            Ok(meta) => {
                trace!(path = %path.display(), "Blob present in storage");
                Ok(meta.is_file())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(RegistryError::IoError { path, source: e }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn store(index: &StorageBlobIndex, content: &[u8]) -> ContentDigest {
        let digest = ContentDigest::sha256_of(content);
        let path = index.blob_path(&digest);
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, content).await.unwrap();
        digest
    }

    #[tokio::test]
    async fn test_exists_for_stored_blob() {
        let dir = TempDir::new().unwrap();
        let index = StorageBlobIndex::new(dir.path());
        let digest = store(&index, b"layer-bytes").await;

        assert!(index.exists(&digest).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_blob() {
        let dir = TempDir::new().unwrap();
        let index = StorageBlobIndex::new(dir.path());

        let digest = ContentDigest::sha256_of(b"never stored");
        assert!(!index.exists(&digest).await.unwrap());
    }

    #[tokio::test]
    async fn test_directory_without_data_file_is_missing() {
        let dir = TempDir::new().unwrap();
        let index = StorageBlobIndex::new(dir.path());
        let digest = ContentDigest::sha256_of(b"partial");
        tokio::fs::create_dir_all(index.blob_path(&digest)).await.unwrap();

        assert!(!index.exists(&digest).await.unwrap());
    }

    #[test]
    fn test_blob_path_layout() {
        let index = StorageBlobIndex::new("/var/lib/registry");
        let digest = ContentDigest::sha256_of(b"x");
        let path = index.blob_path(&digest);
        let expected = format!(
            "/var/lib/registry/docker/registry/v2/blobs/sha256/{}/{}/data",
            &digest.encoded()[..2],
            digest.encoded()
        );
        assert_eq!(path, PathBuf::from(expected));
    }
}
