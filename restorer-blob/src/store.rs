use async_trait::async_trait;
use bytes::Bytes;

use crate::{BlobMetadata, BlobResult, StoredBlob};

/// Core blob storage operations - must be implemented by all storage backends.
///
/// Keys are flat strings; lookups of missing keys return `Ok(None)`.
/// Writes overwrite silently (last writer wins) and there are no
/// transactional guarantees between calls.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes and metadata under a key
    async fn set(&self, key: &str, data: Bytes, metadata: BlobMetadata) -> BlobResult<()>;

    /// Get blob bytes and metadata
    async fn get_with_metadata(&self, key: &str) -> BlobResult<Option<StoredBlob>>;

    /// Get blob metadata without content
    async fn get_metadata(&self, key: &str) -> BlobResult<Option<BlobMetadata>>;

    /// Get blob bytes only
    async fn get(&self, key: &str) -> BlobResult<Option<Bytes>> {
        Ok(self.get_with_metadata(key).await?.map(|blob| blob.data))
    }

    /// Whether a blob exists under the key
    async fn exists(&self, key: &str) -> BlobResult<bool> {
        Ok(self.get_metadata(key).await?.is_some())
    }
}
