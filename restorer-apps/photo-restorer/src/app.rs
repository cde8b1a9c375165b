use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use restorer_blob::{BlobConfig, BlobStore, MemoryBlobStore, S3CompatibleStore};
use restorer_core::{RestoreConfig, RestoreConfigSnapshot, DEFAULT_RESTORE_PROMPT};
use restorer_genai::{GeminiClient, GeminiConfig, ImageModel, DEFAULT_ENDPOINT, DEFAULT_MODEL};

/// Which blob store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobBackend {
    Memory,
    S3,
}

/// Resolved server settings.
#[derive(Debug, Clone)]
pub struct RestorerSettings {
    pub host: String,
    pub port: u16,
    /// Prefix used in the `imageUrl` handed to clients, and the second
    /// mount point of every route.
    pub public_prefix: String,
    pub prompt: String,
    pub blob: BlobConfig,
    pub backend: BlobBackend,
    pub model: String,
    pub endpoint: String,
    pub model_timeout: Option<Duration>,
}

impl RestorerSettings {
    pub fn from_config(config: &RestoreConfigSnapshot) -> Result<Self> {
        let backend = match config.get("blob.backend").unwrap_or("memory") {
            "memory" => BlobBackend::Memory,
            "s3" => BlobBackend::S3,
            other => bail!("unknown blob.backend '{other}' (expected memory or s3)"),
        };

        let mut blob = BlobConfig::new();
        if let Some(namespace) = config.get("blob.namespace") {
            blob = blob.with_namespace(namespace);
        }
        if let Some(max) = config.get_u64("blob.max_bytes") {
            blob = blob.with_max_blob_bytes(max);
        }

        Ok(Self {
            host: config.get_string("http.host").unwrap_or_else(|| "127.0.0.1".into()),
            port: config
                .get("http.port")
                .and_then(|p| p.parse().ok())
                .unwrap_or(3030),
            public_prefix: config
                .get("http.public_prefix")
                .unwrap_or("/api")
                .trim_end_matches('/')
                .to_string(),
            prompt: config
                .get_string("restore.prompt")
                .unwrap_or_else(|| DEFAULT_RESTORE_PROMPT.into()),
            blob,
            backend,
            model: config
                .get_string("genai.model")
                .unwrap_or_else(|| DEFAULT_MODEL.into()),
            endpoint: config
                .get_string("genai.endpoint")
                .unwrap_or_else(|| DEFAULT_ENDPOINT.into()),
            model_timeout: config.get_secs("genai.timeout_secs"),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Defaults overlaid with `RESTORER__*` environment variables.
pub fn load_config() -> RestoreConfig {
    RestoreConfig::from_env()
}

pub async fn blob_store(settings: &RestorerSettings) -> Result<Arc<dyn BlobStore>> {
    Ok(match settings.backend {
        BlobBackend::Memory => Arc::new(MemoryBlobStore::new()),
        BlobBackend::S3 => Arc::new(S3CompatibleStore::from_env().await?),
    })
}

/// The Gemini client, or `None` when `GEMINI_API_KEY` is not set.
pub fn image_model(settings: &RestorerSettings) -> Result<Option<Arc<dyn ImageModel>>> {
    let Some(config) = GeminiConfig::from_env() else {
        tracing::warn!("GEMINI_API_KEY not set; results will fall back to the original image");
        return Ok(None);
    };

    let mut config = config
        .with_model(settings.model.clone())
        .with_endpoint(settings.endpoint.clone());
    if let Some(timeout) = settings.model_timeout {
        config = config.with_timeout(timeout);
    }

    let client: Arc<dyn ImageModel> = Arc::new(GeminiClient::new(config)?);
    Ok(Some(client))
}
