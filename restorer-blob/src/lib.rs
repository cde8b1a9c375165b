//! # restorer-blob: key-value blob storage
//!
//! A blob is a byte payload plus a flat map of string metadata, stored
//! under a string key. Missing keys read back as `None`, never as errors.
//!
//! ```text
//! ┌─────────────────┐
//! │   Your Service  │  ← Business logic only
//! ├─────────────────┤
//! │   BlobAdapter   │  ← Namespacing + size guard
//! ├─────────────────┤
//! │   BlobStore     │  ← Storage primitives (memory, S3)
//! └─────────────────┘
//! ```
//!
//! ```rust
//! use restorer_blob::prelude::*;
//! use bytes::Bytes;
//!
//! # #[tokio::main]
//! # async fn main() -> BlobResult<()> {
//! let blobs = BlobAdapter::new(MemoryBlobStore::new(), BlobConfig::default());
//!
//! let meta = BlobMetadata::new().with("contentType", "image/png");
//! blobs.put("photo", Bytes::from_static(b"..."), meta).await?;
//!
//! let stored = blobs.get_with_metadata("photo").await?.unwrap();
//! assert_eq!(stored.metadata.content_type(), Some("image/png"));
//! # Ok(())
//! # }
//! ```

pub mod adapter;
mod config;
mod error;
mod memory_store;
mod s3_store;
pub mod store;
mod types;

pub use adapter::BlobAdapter;
pub use config::BlobConfig;
pub use error::{BlobError, BlobResult};
pub use memory_store::MemoryBlobStore;
pub use s3_store::{S3CompatibleStore, S3Config};
pub use store::BlobStore;
pub use types::{BlobMetadata, StoredBlob};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BlobAdapter, BlobConfig, BlobError, BlobMetadata, BlobResult, BlobStore, MemoryBlobStore,
        StoredBlob,
    };
}
