use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use restorer_core::RestoreError;

/// Error type returned by handlers. Wraps any `anyhow::Error`; a
/// `RestoreError` anywhere in the chain decides the status and body.
#[derive(Debug)]
pub struct RestoreAxumError(pub anyhow::Error);

impl From<anyhow::Error> for RestoreAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl From<RestoreError> for RestoreAxumError {
    fn from(e: RestoreError) -> Self {
        Self(e.into_anyhow())
    }
}

impl IntoResponse for RestoreAxumError {
    fn into_response(self) -> Response {
        let safe = match RestoreError::find(&self.0) {
            Some(restore) => restore.sanitize_for_client(),
            None => RestoreError::general_error("Internal server error"),
        };

        let status =
            StatusCode::from_u16(safe.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %format!("{:#}", self.0), "request failed");
        }

        (status, Json(safe.to_json())).into_response()
    }
}

/// Method fallback for routes that only answer some verbs.
pub async fn method_not_allowed() -> RestoreAxumError {
    RestoreError::method_not_allowed("Method not allowed").into()
}
