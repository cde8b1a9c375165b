use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use tracing::{debug, warn};

use crate::config::GeminiConfig;
use crate::error::{GenAiError, GenAiResult};
use crate::model::{
    GeneratedImage, ImageModel, ImageRequest, ModelReply, ResponsePart, DEFAULT_OUTPUT_MIME,
};
use crate::types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, WirePart,
};

/// Gemini `generateContent` client asking for text and image output.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> GenAiResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(GenAiError::Configuration("Gemini API key is empty".into()));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| GenAiError::Configuration(e.to_string()))?;

        Ok(Self { http, config })
    }

    /// `None` when no API key is configured in the environment.
    pub fn from_env() -> GenAiResult<Option<Self>> {
        GeminiConfig::from_env().map(Self::new).transpose()
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }

    fn build_body(request: &ImageRequest) -> GenerateContentRequest {
        let data = base64::engine::general_purpose::STANDARD.encode(&request.image);
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".into()),
                parts: vec![
                    WirePart::text(request.prompt.clone()),
                    WirePart::inline(request.mime_type.clone(), data),
                ],
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["TEXT", "IMAGE"],
            },
        }
    }

    fn decode_reply(response: GenerateContentResponse) -> GenAiResult<ModelReply> {
        let parts = response
            .into_first_parts()
            .into_iter()
            .map(Self::decode_part)
            .collect::<GenAiResult<Vec<_>>>()?;
        Ok(ModelReply::new(parts))
    }

    fn decode_part(part: WirePart) -> GenAiResult<ResponsePart> {
        if let Some(inline) = part.inline_data {
            let data = base64::engine::general_purpose::STANDARD
                .decode(inline.data.as_bytes())
                .map_err(|e| GenAiError::Decode(format!("invalid inline image data: {e}")))?;
            let mime_type = inline
                .mime_type
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_OUTPUT_MIME.to_string());
            return Ok(ResponsePart::Image(GeneratedImage {
                mime_type,
                data: Bytes::from(data),
            }));
        }

        Ok(match part.text {
            Some(text) if !text.is_empty() => ResponsePart::Text(text),
            _ => ResponsePart::Other,
        })
    }
}

#[async_trait]
impl ImageModel for GeminiClient {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, request: ImageRequest) -> GenAiResult<ModelReply> {
        let body = Self::build_body(&request);

        debug!(
            model = %self.config.model,
            mime_type = %request.mime_type,
            bytes = request.image.len(),
            "sending image generation request"
        );

        let response = self
            .http
            .post(self.url())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenAiError::Timeout
                } else {
                    GenAiError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "image model API returned error");
            return Err(GenAiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GenAiError::Decode(e.to_string()))?;

        let reply = Self::decode_reply(parsed)?;
        debug!(
            parts = reply.parts.len(),
            has_image = reply.first_image().is_some(),
            "image model replied"
        );
        Ok(reply)
    }
}
