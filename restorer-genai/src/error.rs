use thiserror::Error;

/// Errors raised while calling an image model.
#[derive(Debug, Error)]
pub enum GenAiError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Request timed out.
    #[error("image model request timed out")]
    Timeout,

    /// The model API answered with a non-success status.
    #[error("image model API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    /// The response could not be decoded.
    #[error("failed to decode model response: {0}")]
    Decode(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

pub type GenAiResult<T> = Result<T, GenAiError>;
