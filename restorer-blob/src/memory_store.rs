use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use crate::{BlobMetadata, BlobResult, BlobStore, StoredBlob};

/// In-process blob store. Clones share the same contents.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<RwLock<HashMap<String, StoredBlob>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }

    /// Stored keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.blobs.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn set(&self, key: &str, data: Bytes, metadata: BlobMetadata) -> BlobResult<()> {
        self.blobs
            .write()
            .insert(key.to_string(), StoredBlob::new(data, metadata));
        Ok(())
    }

    async fn get_with_metadata(&self, key: &str) -> BlobResult<Option<StoredBlob>> {
        Ok(self.blobs.read().get(key).cloned())
    }

    async fn get_metadata(&self, key: &str) -> BlobResult<Option<BlobMetadata>> {
        Ok(self.blobs.read().get(key).map(|blob| blob.metadata.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let store = MemoryBlobStore::new();
        let meta = BlobMetadata::new().with("contentType", "image/png");

        store
            .set("a-original", Bytes::from_static(b"png"), meta.clone())
            .await
            .unwrap();

        let blob = store.get_with_metadata("a-original").await.unwrap().unwrap();
        assert_eq!(blob.data, Bytes::from_static(b"png"));
        assert_eq!(blob.metadata.content_type(), Some("image/png"));
        assert_eq!(store.get_metadata("a-original").await.unwrap(), Some(meta));
        assert_eq!(store.get("a-original").await.unwrap().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_missing_key_is_none() {
        let store = MemoryBlobStore::new();
        assert!(store.get_with_metadata("nope").await.unwrap().is_none());
        assert!(store.get_metadata("nope").await.unwrap().is_none());
        assert!(!store.exists("nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_last_writer_wins() {
        let store = MemoryBlobStore::new();
        store.set("k", Bytes::from_static(b"1"), BlobMetadata::new()).await.unwrap();
        store.set("k", Bytes::from_static(b"2"), BlobMetadata::new()).await.unwrap();

        assert_eq!(store.get("k").await.unwrap().unwrap(), Bytes::from_static(b"2"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_clones_share_contents() {
        let store = MemoryBlobStore::new();
        let other = store.clone();
        store.set("k", Bytes::from_static(b"x"), BlobMetadata::new()).await.unwrap();
        assert_eq!(other.keys(), vec!["k".to_string()]);
    }
}
