use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{GenAiError, GenAiResult};
use crate::model::{ImageModel, ImageRequest, ModelReply};

/// A model that answers every request with the same reply.
///
/// Counts calls so tests can assert how often the model was invoked.
#[derive(Debug, Clone)]
pub struct StaticImageModel {
    name: String,
    reply: ModelReply,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl StaticImageModel {
    pub fn new(name: impl Into<String>, reply: ModelReply) -> Self {
        Self {
            name: name.into(),
            reply,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Sleep before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageModel for StaticImageModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, _request: ImageRequest) -> GenAiResult<ModelReply> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.reply.clone())
    }
}

/// A model that always fails with an API error.
#[derive(Debug, Clone)]
pub struct FailingImageModel {
    name: String,
    message: String,
    calls: Arc<AtomicUsize>,
}

impl FailingImageModel {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            name: "failing-model".into(),
            message: message.into(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageModel for FailingImageModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, _request: ImageRequest) -> GenAiResult<ModelReply> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(GenAiError::Api {
            status: 500,
            body: self.message.clone(),
        })
    }
}
