use std::collections::HashMap;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use restorer_axum::{method_not_allowed, read_multipart, MultipartConfig, RestoreAxumError};
use restorer_core::{RestoreError, StatusReport};
use serde_json::{json, Value};

use super::restorations_service::{InlineRestore, RestorationsService};

#[derive(Clone)]
struct RoutesState {
    service: RestorationsService,
    multipart: MultipartConfig,
}

type Params = Query<HashMap<String, String>>;

/// `/upload`, `/status`, `/serve` and `/restore`.
pub fn routes(service: RestorationsService) -> Router<()> {
    let max = service.settings().blob.max_blob_bytes;
    let state = RoutesState {
        service,
        multipart: MultipartConfig::new()
            .max_file_size(max)
            .max_total_size(max.saturating_add(1024 * 1024)),
    };

    Router::new()
        .route("/upload", post(upload).fallback(method_not_allowed))
        .route("/status", get(status).fallback(method_not_allowed))
        .route("/serve", get(serve).fallback(method_not_allowed))
        .route("/restore", post(restore).fallback(method_not_allowed))
        .with_state(state)
}

async fn upload(
    State(state): State<RoutesState>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<Value>, RestoreAxumError> {
    let mut form = read_multipart(&headers, body, &state.multipart).await?;
    let id = state.service.upload(form.take_file("image")).await?;
    Ok(Json(json!({ "id": id })))
}

async fn status(
    State(state): State<RoutesState>,
    Query(params): Params,
) -> Result<Json<StatusReport>, RestoreAxumError> {
    let report = state
        .service
        .status(params.get("id").map(String::as_str))
        .await?;
    Ok(Json(report))
}

async fn serve(
    State(state): State<RoutesState>,
    Query(params): Params,
) -> Result<Response, RestoreAxumError> {
    let blob = state
        .service
        .open(
            params.get("id").map(String::as_str),
            params.get("type").map(String::as_str),
        )
        .await?;

    let content_type = blob
        .metadata
        .content_type()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));

    Ok(([(header::CONTENT_TYPE, content_type)], blob.data).into_response())
}

/// Failure bodies on `/restore` are `{success: false, error, ...}` rather
/// than the generic error shape.
fn restore_failure(err: anyhow::Error) -> Response {
    let failure = RestoreError::find(&err)
        .map(RestoreError::sanitize_for_client)
        .unwrap_or_else(|| RestoreError::general_error("Failed to process image"));

    let status =
        StatusCode::from_u16(failure.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut body = json!({ "success": false, "error": failure.message });
    if let Some(Value::Object(extra)) = &failure.data {
        for (key, value) in extra {
            body[key.as_str()] = value.clone();
        }
    }
    (status, Json(body)).into_response()
}

async fn restore(State(state): State<RoutesState>, headers: HeaderMap, body: Body) -> Response {
    if !state.service.has_model() {
        return restore_failure(
            RestoreError::general_error("Gemini API key not configured").into_anyhow(),
        );
    }

    let mut form = match read_multipart(&headers, body, &state.multipart).await {
        Ok(form) => form,
        Err(err) => return restore_failure(err),
    };
    let prompt = form.text("prompt").map(str::to_string);

    match state
        .service
        .restore_inline(form.take_file("image"), prompt.as_deref())
        .await
    {
        Ok(InlineRestore::Restored { image, text, model }) => Json(json!({
            "success": true,
            "imageUrl": image.data_url(),
            "text": text,
            "model": model,
        }))
        .into_response(),
        Ok(InlineRestore::NoImage { text }) => restore_failure(
            RestoreError::unprocessable("No image was generated")
                .with_data(json!({ "text": text }))
                .into_anyhow(),
        ),
        Err(err) => restore_failure(err),
    }
}
