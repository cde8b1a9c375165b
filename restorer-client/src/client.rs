use std::time::Duration;

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use restorer_core::{BlobVariant, JobId, StatusReport};
use serde::Deserialize;
use tracing::debug;

use crate::error::ClientError;

/// Default request timeout. Generous because `/restore` waits on the model.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Default path prefix of the API routes.
pub const DEFAULT_API_PREFIX: &str = "/api";

/// An image to send: bytes, file name and mime type.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub data: Bytes,
    pub filename: String,
    pub mime_type: String,
}

impl ImageUpload {
    pub fn new(data: impl Into<Bytes>, filename: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            filename: filename.into(),
            mime_type: mime_type.into(),
        }
    }

    fn part(&self) -> Result<Part, ClientError> {
        Part::bytes(self.data.to_vec())
            .file_name(self.filename.clone())
            .mime_str(&self.mime_type)
            .map_err(|e| ClientError::Configuration(format!("invalid mime type: {e}")))
    }
}

/// A fetched image with the server-declared content type.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Successful answer of the synchronous restore endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoredImage {
    /// `data:<mime>;base64,<payload>` URL.
    pub image_url: String,
    #[serde(default)]
    pub text: String,
    pub model: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    id: JobId,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
    text: Option<String>,
}

/// Builder for configuring a [`RestorerClient`].
#[derive(Debug)]
pub struct RestorerClientBuilder {
    base_url: String,
    api_prefix: String,
    timeout: Duration,
    client: Option<Client>,
}

impl RestorerClientBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            timeout: DEFAULT_TIMEOUT,
            client: None,
        }
    }

    /// Prefix in front of `/upload`, `/status`, `/serve` and `/restore`.
    /// Pass `""` for a server mounted at the root.
    #[must_use]
    pub fn api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = prefix.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use a custom reqwest Client.
    #[must_use]
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> Result<RestorerClient, ClientError> {
        let client = match self.client {
            Some(c) => c,
            None => Client::builder()
                .timeout(self.timeout)
                .build()
                .map_err(|e| ClientError::Configuration(e.to_string()))?,
        };

        Ok(RestorerClient {
            client,
            base_url: self.base_url,
            api_prefix: self.api_prefix,
        })
    }
}

/// HTTP client for the photo restorer API.
#[derive(Debug, Clone)]
pub struct RestorerClient {
    client: Client,
    base_url: String,
    api_prefix: String,
}

impl RestorerClient {
    pub fn builder(base_url: impl Into<String>) -> RestorerClientBuilder {
        RestorerClientBuilder::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_prefix(&self) -> &str {
        &self.api_prefix
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, self.api_prefix, path)
    }

    /// Resolve a URL returned by the server. Relative URLs are taken from
    /// the host root, absolute ones are used as is.
    pub fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}/{}", self.base_url, url.trim_start_matches('/'))
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, ClientError> {
        request
            .send()
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))
    }

    async fn error_from(response: Response) -> ClientError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.message.or(b.error))
            .unwrap_or(body);
        ClientError::Http { status, message }
    }

    async fn json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Deserialization(e.to_string()))
    }

    pub async fn health(&self) -> Result<bool, ClientError> {
        let response = self
            .send(self.client.get(format!("{}/health", self.base_url)))
            .await?;
        Ok(response.status().is_success())
    }

    /// Upload an original. Returns the new job id.
    pub async fn upload(&self, image: &ImageUpload) -> Result<JobId, ClientError> {
        let form = Form::new().part("image", image.part()?);
        let response = self
            .send(self.client.post(self.api_url("/upload")).multipart(form))
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        let body: UploadResponse = Self::json(response).await?;
        debug!(id = %body.id, "uploaded original");
        Ok(body.id)
    }

    /// Ask for the job status. The server may run the model before answering.
    pub async fn status(&self, id: &JobId) -> Result<StatusReport, ClientError> {
        let response = self
            .send(
                self.client
                    .get(self.api_url("/status"))
                    .query(&[("id", id.as_str())]),
            )
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        Self::json(response).await
    }

    pub async fn fetch(&self, id: &JobId, variant: BlobVariant) -> Result<FetchedImage, ClientError> {
        let request = self
            .client
            .get(self.api_url("/serve"))
            .query(&[("id", id.as_str()), ("type", variant.as_str())]);
        self.fetch_request(request).await
    }

    /// Fetch by a URL the server handed out, such as a status `imageUrl`.
    pub async fn fetch_url(&self, url: &str) -> Result<FetchedImage, ClientError> {
        let request = self.client.get(self.resolve(url));
        self.fetch_request(request).await
    }

    async fn fetch_request(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<FetchedImage, ClientError> {
        let response = self.send(request).await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let data = response
            .bytes()
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        Ok(FetchedImage { content_type, data })
    }

    /// Restore synchronously. A reply without an image is
    /// [`ClientError::NotRestored`] carrying the model's text.
    pub async fn restore(
        &self,
        image: &ImageUpload,
        prompt: Option<&str>,
    ) -> Result<RestoredImage, ClientError> {
        let mut form = Form::new().part("image", image.part()?);
        if let Some(prompt) = prompt {
            form = form.text("prompt", prompt.to_string());
        }

        let response = self
            .send(self.client.post(self.api_url("/restore")).multipart(form))
            .await?;

        let status = response.status();
        if status.is_success() {
            return Self::json(response).await;
        }

        if status == reqwest::StatusCode::UNPROCESSABLE_ENTITY {
            let body: ErrorBody = Self::json(response).await?;
            return Err(ClientError::NotRestored {
                text: body.text.unwrap_or_default(),
            });
        }

        Err(Self::error_from(response).await)
    }
}
