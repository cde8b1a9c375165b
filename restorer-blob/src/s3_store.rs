use std::collections::HashMap;
use std::env;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::{primitives::ByteStream as AwsByteStream, Client};
use base64::Engine;
use bytes::Bytes;

use crate::{BlobError, BlobMetadata, BlobResult, BlobStore, StoredBlob};

/// User-metadata entry holding the encoded [`BlobMetadata`].
///
/// S3 lowercases user-metadata keys, so the camelCase map travels as one
/// base64 JSON value instead of one header per field.
const METADATA_KEY: &str = "restorer-meta";

/// S3-compatible storage configuration
#[derive(Debug, Clone)]
pub struct S3Config {
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub endpoint_url: String,
    pub bucket: String,
}

impl S3Config {
    /// Read `S3_REGION`, `S3_ACCESS_KEY_ID`, `S3_SECRET_ACCESS_KEY`,
    /// `S3_ENDPOINT_URL` and `S3_BUCKET` (defaults to `restorer`).
    pub fn from_env() -> BlobResult<Self> {
        fn get_env(key: &str) -> BlobResult<String> {
            env::var(key).map_err(|_| BlobError::invalid(format!("{} environment variable required", key)))
        }

        Ok(Self {
            region: get_env("S3_REGION")?,
            access_key_id: get_env("S3_ACCESS_KEY_ID")?,
            secret_access_key: get_env("S3_SECRET_ACCESS_KEY")?,
            endpoint_url: get_env("S3_ENDPOINT_URL")?,
            bucket: env::var("S3_BUCKET").unwrap_or_else(|_| "restorer".to_string()),
        })
    }
}

/// Blob store backed by any S3-compatible object storage
#[derive(Clone)]
pub struct S3CompatibleStore {
    client: Client,
    bucket: String,
}

impl S3CompatibleStore {
    pub async fn new(config: S3Config) -> Self {
        let bucket = config.bucket.clone();
        let client = Self::create_client(config).await;
        Self { client, bucket }
    }

    pub async fn from_env() -> BlobResult<Self> {
        Ok(Self::new(S3Config::from_env()?).await)
    }

    async fn create_client(config: S3Config) -> Client {
        let credentials = Credentials::new(
            config.access_key_id,
            config.secret_access_key,
            None,
            None,
            "restorer",
        );

        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .endpoint_url(config.endpoint_url)
            .load()
            .await;

        Client::from_conf(
            aws_sdk_s3::config::Builder::from(&aws_config)
                .force_path_style(true)
                .build(),
        )
    }
}

fn encode_metadata(metadata: &BlobMetadata) -> BlobResult<String> {
    let json = serde_json::to_vec(metadata)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(json))
}

/// Rebuild metadata from the encoded entry, falling back to the object's
/// content type for objects written by other tools.
fn decode_metadata(
    content_type: Option<&str>,
    user_metadata: Option<&HashMap<String, String>>,
) -> BlobMetadata {
    let decoded = user_metadata
        .and_then(|m| m.get(METADATA_KEY))
        .and_then(|encoded| base64::engine::general_purpose::STANDARD.decode(encoded).ok())
        .and_then(|json| serde_json::from_slice::<BlobMetadata>(&json).ok());

    match decoded {
        Some(metadata) => metadata,
        None => {
            let mut metadata = BlobMetadata::new();
            if let Some(ct) = content_type {
                metadata.insert("contentType", ct);
            }
            metadata
        }
    }
}

#[async_trait]
impl BlobStore for S3CompatibleStore {
    async fn set(&self, key: &str, data: Bytes, metadata: BlobMetadata) -> BlobResult<()> {
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(AwsByteStream::from(data))
            .metadata(METADATA_KEY, encode_metadata(&metadata)?);

        if let Some(ct) = metadata.content_type() {
            request = request.content_type(ct);
        }

        request.send().await.map_err(BlobError::backend)?;
        Ok(())
    }

    async fn get_with_metadata(&self, key: &str) -> BlobResult<Option<StoredBlob>> {
        let result = match self.client.get_object().bucket(&self.bucket).key(key).send().await {
            Ok(result) => result,
            Err(err) => {
                if err.as_service_error().is_some_and(|e| e.is_no_such_key()) {
                    return Ok(None);
                }
                return Err(BlobError::backend(err));
            }
        };

        let metadata = decode_metadata(result.content_type(), result.metadata());
        let body = result.body.collect().await.map_err(BlobError::backend)?;

        Ok(Some(StoredBlob::new(body.into_bytes(), metadata)))
    }

    async fn get_metadata(&self, key: &str) -> BlobResult<Option<BlobMetadata>> {
        match self.client.head_object().bucket(&self.bucket).key(key).send().await {
            Ok(head) => Ok(Some(decode_metadata(head.content_type(), head.metadata()))),
            Err(err) => {
                if err.as_service_error().is_some_and(|e| e.is_not_found()) {
                    return Ok(None);
                }
                Err(BlobError::backend(err))
            }
        }
    }
}
