use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;

use crate::error::GenAiResult;

/// Mime type assumed for uploads that arrive without one.
pub const DEFAULT_INPUT_MIME: &str = "image/jpeg";

/// Mime type assumed for generated images that arrive without one.
pub const DEFAULT_OUTPUT_MIME: &str = "image/png";

/// One image plus a text instruction.
#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub prompt: String,
    pub image: Bytes,
    pub mime_type: String,
}

impl ImageRequest {
    pub fn new(prompt: impl Into<String>, image: Bytes, mime_type: Option<&str>) -> Self {
        let mime_type = mime_type
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(DEFAULT_INPUT_MIME)
            .to_string();
        Self {
            prompt: prompt.into(),
            image,
            mime_type,
        }
    }
}

/// A generated image, already decoded from the wire encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub mime_type: String,
    pub data: Bytes,
}

impl GeneratedImage {
    pub fn base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    /// `data:<mime>;base64,<payload>` form.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64())
    }
}

/// One part of a model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePart {
    Text(String),
    Image(GeneratedImage),
    /// Anything else the model sent (thoughts, tool calls, empty parts).
    Other,
}

/// The ordered parts of the first candidate of a model reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelReply {
    pub parts: Vec<ResponsePart>,
}

impl ModelReply {
    pub fn new(parts: Vec<ResponsePart>) -> Self {
        Self { parts }
    }

    /// First image part in order. Later images are ignored, even when the
    /// first one carries no bytes.
    pub fn first_image(&self) -> Option<&GeneratedImage> {
        self.parts
            .iter()
            .find_map(|part| match part {
                ResponsePart::Image(image) => Some(image),
                _ => None,
            })
            .filter(|image| !image.data.is_empty())
    }

    /// First non-empty text part.
    pub fn first_text(&self) -> Option<&str> {
        self.parts.iter().find_map(|part| match part {
            ResponsePart::Text(text) if !text.is_empty() => Some(text.as_str()),
            _ => None,
        })
    }
}

/// A generative model that can take an image plus instructions and
/// answer with images and/or text.
#[async_trait]
pub trait ImageModel: Send + Sync {
    /// Identifier recorded as `generatedBy` and returned as `model`.
    fn name(&self) -> &str;

    async fn generate(&self, request: ImageRequest) -> GenAiResult<ModelReply>;
}
