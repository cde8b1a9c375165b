use std::time::Duration;

/// Default Gemini REST endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default image-capable model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";

/// Environment variable holding the API credential.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Configuration for the Gemini image client.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// REST base URL, without the `/models/...` suffix.
    pub endpoint: String,
    /// Model name, also reported as `generatedBy`.
    pub model: String,
    /// API key for authentication.
    pub api_key: String,
    /// Request timeout. `None` waits as long as the upstream takes.
    pub timeout: Option<Duration>,
}

impl GeminiConfig {
    /// Create a config with the default endpoint and model and no timeout.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.into(),
            timeout: None,
        }
    }

    /// Build from `GEMINI_API_KEY`. Returns `None` when the credential is
    /// absent or blank, which callers treat as "model unavailable".
    pub fn from_env() -> Option<Self> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(Self::new)
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
