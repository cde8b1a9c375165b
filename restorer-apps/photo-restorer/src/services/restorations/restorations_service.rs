use std::sync::Arc;

use anyhow::Result;
use dashmap::DashMap;
use restorer_axum::FormFile;
use restorer_blob::{BlobAdapter, BlobError, BlobMetadata, StoredBlob};
use restorer_core::job::{meta, serve_url, timestamp_now, FALLBACK_GENERATOR, UPLOAD_STATUS};
use restorer_core::{bail_restore, BlobVariant, JobId, RestoreError, StatusReport};
use restorer_genai::{GeneratedImage, ImageModel, ImageRequest, ModelReply, ResponsePart};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::app::RestorerSettings;

const UNTYPED_CONTENT_TYPE: &str = "application/octet-stream";

/// How a status call ended up with a result blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultSource {
    /// Another call had already written it.
    Existing,
    /// The model produced an image.
    Generated { model: String },
    /// The original was copied because no image came back.
    Fallback,
}

/// Outcome of the synchronous restore path.
#[derive(Debug, Clone)]
pub enum InlineRestore {
    Restored {
        image: GeneratedImage,
        text: String,
        model: String,
    },
    NoImage {
        text: String,
    },
}

/// Upload, status, serve and restore over the blob store and image model.
#[derive(Clone)]
pub struct RestorationsService {
    blobs: BlobAdapter,
    model: Option<Arc<dyn ImageModel>>,
    settings: Arc<RestorerSettings>,
    in_flight: Arc<InFlight>,
}

fn storage_error(message: &'static str, err: BlobError) -> anyhow::Error {
    match err {
        BlobError::TooLarge { size, limit } => RestoreError::bad_request(format!(
            "Image of {size} bytes exceeds the {limit} byte limit"
        ))
        .into_anyhow(),
        other => {
            error!(error = %other, "{}", message);
            RestoreError::general_error(message)
                .with_source(other)
                .into_anyhow()
        }
    }
}

fn require_id(id: Option<&str>) -> Result<JobId> {
    match id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => Ok(JobId::from_string(id)),
        None => Err(RestoreError::bad_request("Missing ID").into_anyhow()),
    }
}

/// Mime type handed to the model. The octet-stream placeholder stored for
/// untyped uploads counts as unknown so the request default applies.
fn model_mime(content_type: Option<&str>) -> Option<&str> {
    content_type.filter(|ct| *ct != UNTYPED_CONTENT_TYPE)
}

type InFlight = DashMap<String, Arc<Mutex<()>>>;

/// Drop the map entry for `key` once `lock` is its only outside holder.
/// Queued waiters keep their clone, so the entry survives until the last one.
fn release_in_flight(in_flight: &InFlight, key: &str, lock: &Arc<Mutex<()>>) {
    in_flight.remove_if(key, |_, entry| {
        Arc::ptr_eq(entry, lock) && Arc::strong_count(entry) == 2
    });
}

fn log_reply(reply: &ModelReply) {
    debug!(parts = reply.parts.len(), "model reply");
    for (index, part) in reply.parts.iter().enumerate() {
        let kind = match part {
            ResponsePart::Text(_) => "text",
            ResponsePart::Image(_) => "image",
            ResponsePart::Other => "other",
        };
        debug!(index, kind, "model reply part");
    }
}

impl RestorationsService {
    pub fn new(
        blobs: BlobAdapter,
        model: Option<Arc<dyn ImageModel>>,
        settings: Arc<RestorerSettings>,
    ) -> Self {
        Self {
            blobs,
            model,
            settings,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    pub fn settings(&self) -> &RestorerSettings {
        &self.settings
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Store an uploaded original and hand out its id.
    pub async fn upload(&self, image: Option<FormFile>) -> Result<JobId> {
        let Some(image) = image else {
            bail_restore!(bad_request, "No image uploaded");
        };

        let id = JobId::new();
        let content_type = image
            .content_type
            .clone()
            .unwrap_or_else(|| UNTYPED_CONTENT_TYPE.into());
        let size = image.data.len();

        let metadata = BlobMetadata::new()
            .with(meta::CONTENT_TYPE, content_type.as_str())
            .with(meta::UPLOADED_AT, timestamp_now())
            .with(meta::STATUS, UPLOAD_STATUS)
            .with(meta::PROMPT, self.settings.prompt.as_str());

        self.blobs
            .put(&id.original_key(), image.data, metadata)
            .await
            .map_err(|e| storage_error("Upload failed", e))?;

        info!(%id, size, %content_type, "original uploaded");
        Ok(id)
    }

    /// Report the job state, generating the result first if it is missing.
    pub async fn status(&self, id: Option<&str>) -> Result<StatusReport> {
        let id = require_id(id)?;

        let original = self
            .blobs
            .get_metadata(&id.original_key())
            .await
            .map_err(|e| storage_error("Check failed", e))?;
        if original.is_none() {
            bail_restore!(not_found, "Not found");
        }

        let has_result = self
            .blobs
            .exists(&id.result_key())
            .await
            .map_err(|e| storage_error("Check failed", e))?;

        if !has_result {
            let source = self.generate_result(&id).await?;
            debug!(%id, ?source, "result ready");
        }

        Ok(StatusReport::completed(serve_url(
            &self.settings.public_prefix,
            &id,
            BlobVariant::Result,
        )))
    }

    /// Write the result blob for a job unless one exists.
    ///
    /// Calls for the same id inside this process are serialised on one
    /// mutex that stays registered until its last waiter is done; a waiter
    /// re-checks for the result before calling the model. Separate
    /// processes can still both generate, and the last write wins.
    pub async fn generate_result(&self, id: &JobId) -> Result<ResultSource> {
        let lock = self
            .in_flight
            .entry(id.as_str().to_string())
            .or_default()
            .clone();
        let guard = lock.lock().await;
        let outcome = self.generate_locked(id).await;
        drop(guard);

        release_in_flight(&self.in_flight, id.as_str(), &lock);
        outcome
    }

    async fn generate_locked(&self, id: &JobId) -> Result<ResultSource> {
        if self
            .blobs
            .exists(&id.result_key())
            .await
            .map_err(|e| storage_error("Check failed", e))?
        {
            return Ok(ResultSource::Existing);
        }

        let Some(original) = self
            .blobs
            .get_with_metadata(&id.original_key())
            .await
            .map_err(|e| storage_error("Check failed", e))?
        else {
            bail_restore!(not_found, "Not found");
        };

        let (data, metadata, source) = match self.invoke_model(id, &original).await {
            Some((image, model)) => (
                image.data,
                BlobMetadata::new()
                    .with(meta::CONTENT_TYPE, image.mime_type)
                    .with(meta::GENERATED_BY, model.as_str()),
                ResultSource::Generated { model },
            ),
            None => {
                let mut metadata = BlobMetadata::new().with(meta::GENERATED_BY, FALLBACK_GENERATOR);
                if let Some(ct) = original.metadata.content_type() {
                    metadata.insert(meta::CONTENT_TYPE, ct);
                }
                (original.data.clone(), metadata, ResultSource::Fallback)
            }
        };

        self.blobs
            .put(&id.result_key(), data, metadata)
            .await
            .map_err(|e| storage_error("Check failed", e))?;

        info!(%id, ?source, "result stored");
        Ok(source)
    }

    /// Run the model on the original. `None` means "use the fallback".
    async fn invoke_model(
        &self,
        id: &JobId,
        original: &StoredBlob,
    ) -> Option<(GeneratedImage, String)> {
        let Some(model) = &self.model else {
            warn!(%id, "no image model configured, copying original as result");
            return None;
        };

        let prompt = original
            .metadata
            .get(meta::PROMPT)
            .unwrap_or(self.settings.prompt.as_str())
            .to_string();
        let request = ImageRequest::new(
            prompt,
            original.data.clone(),
            model_mime(original.metadata.content_type()),
        );

        match model.generate(request).await {
            Ok(reply) => {
                log_reply(&reply);
                if let Some(image) = reply.first_image() {
                    return Some((image.clone(), model.name().to_string()));
                }
                match reply.first_text() {
                    Some(text) => warn!(%id, text, "model returned no image"),
                    None => warn!(%id, "model returned no image and no text"),
                }
                None
            }
            Err(err) => {
                error!(%id, error = %err, "model call failed, copying original as result");
                None
            }
        }
    }

    /// Read a blob for serving. A missing result falls back to the original.
    pub async fn open(&self, id: Option<&str>, variant: Option<&str>) -> Result<StoredBlob> {
        let id = require_id(id)?;
        let variant = match variant {
            None => BlobVariant::Original,
            Some(v) => BlobVariant::parse(v).ok_or_else(|| {
                RestoreError::bad_request(format!("Unknown type '{v}'"))
                    .with_errors(json!({"type": ["expected original or result"]}))
                    .into_anyhow()
            })?,
        };

        if variant == BlobVariant::Result {
            if let Some(blob) = self
                .blobs
                .get_with_metadata(&id.result_key())
                .await
                .map_err(|e| storage_error("Error serving image", e))?
            {
                return Ok(blob);
            }
            debug!(%id, "result missing, serving original");
        }

        self.blobs
            .get_with_metadata(&id.original_key())
            .await
            .map_err(|e| storage_error("Error serving image", e))?
            .ok_or_else(|| RestoreError::not_found("Not found").into_anyhow())
    }

    /// Restore without touching storage.
    pub async fn restore_inline(
        &self,
        image: Option<FormFile>,
        prompt: Option<&str>,
    ) -> Result<InlineRestore> {
        let Some(model) = &self.model else {
            return Err(RestoreError::general_error("Gemini API key not configured").into_anyhow());
        };
        let Some(image) = image else {
            bail_restore!(bad_request, "No image uploaded");
        };

        let prompt = prompt
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(self.settings.prompt.as_str());
        let request = ImageRequest::new(
            prompt,
            image.data,
            model_mime(image.content_type.as_deref()),
        );
        info!(model = model.name(), mime_type = %request.mime_type, "inline restore");

        let reply = model.generate(request).await.map_err(|err| {
            error!(error = %err, "inline restore failed");
            RestoreError::general_error("Failed to process image")
                .with_data(json!({"details": err.to_string()}))
                .with_source(err)
                .into_anyhow()
        })?;
        log_reply(&reply);

        let text = reply.first_text().map(str::to_string);
        Ok(match reply.first_image() {
            Some(image) => InlineRestore::Restored {
                image: image.clone(),
                text: text.unwrap_or_default(),
                model: model.name().to_string(),
            },
            None => {
                if let Some(text) = &text {
                    warn!(text = %text, "no image generated");
                }
                InlineRestore::NoImage {
                    text: text.unwrap_or_else(|| "No response from model".into()),
                }
            }
        })
    }
}
