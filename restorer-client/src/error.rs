use thiserror::Error;

/// Errors returned by [`RestorerClient`](crate::RestorerClient) and the flows.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never got a response.
    #[error("connection error: {0}")]
    Connection(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// `/restore` ran but the model produced no image.
    #[error("no image was generated: {text}")]
    NotRestored { text: String },

    #[error("failed to decode response: {0}")]
    Deserialization(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    /// The flow was cancelled by the caller.
    #[error("cancelled")]
    Cancelled,
}

impl ClientError {
    /// Whether this counts toward the poll loop's consecutive-failure limit.
    pub fn is_poll_failure(&self) -> bool {
        matches!(
            self,
            ClientError::Connection(_) | ClientError::Http { .. } | ClientError::Deserialization(_)
        )
    }
}
