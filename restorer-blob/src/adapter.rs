use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::{BlobConfig, BlobError, BlobMetadata, BlobResult, BlobStore, StoredBlob};

/// The blob adapter services embed: scopes keys to a namespace and
/// enforces the size guard before anything reaches the store.
#[derive(Clone)]
pub struct BlobAdapter {
    store: Arc<dyn BlobStore>,
    config: BlobConfig,
}

impl BlobAdapter {
    /// Create a new blob adapter
    pub fn new<S: BlobStore + 'static>(store: S, config: BlobConfig) -> Self {
        Self::from_arc(Arc::new(store), config)
    }

    /// Create from a store that is already shared
    pub fn from_arc(store: Arc<dyn BlobStore>, config: BlobConfig) -> Self {
        Self { store, config }
    }

    fn scoped_key(&self, key: &str) -> String {
        format!("{}/{}", self.config.namespace, key)
    }

    /// Store a blob
    pub async fn put(&self, key: &str, data: Bytes, metadata: BlobMetadata) -> BlobResult<()> {
        let size = data.len() as u64;
        if size > self.config.max_blob_bytes {
            return Err(BlobError::TooLarge {
                size,
                limit: self.config.max_blob_bytes,
            });
        }

        debug!(key, size, namespace = %self.config.namespace, "storing blob");
        self.store.set(&self.scoped_key(key), data, metadata).await
    }

    pub async fn get(&self, key: &str) -> BlobResult<Option<Bytes>> {
        self.store.get(&self.scoped_key(key)).await
    }

    pub async fn get_with_metadata(&self, key: &str) -> BlobResult<Option<StoredBlob>> {
        self.store.get_with_metadata(&self.scoped_key(key)).await
    }

    pub async fn get_metadata(&self, key: &str) -> BlobResult<Option<BlobMetadata>> {
        self.store.get_metadata(&self.scoped_key(key)).await
    }

    pub async fn exists(&self, key: &str) -> BlobResult<bool> {
        self.store.exists(&self.scoped_key(key)).await
    }

    /// Get configuration
    pub fn config(&self) -> &BlobConfig {
        &self.config
    }
}
