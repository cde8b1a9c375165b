use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use photo_restorer::{build_with, RestorationsService, RestorerSettings};
use restorer_blob::{
    BlobAdapter, BlobError, BlobMetadata, BlobResult, BlobStore, MemoryBlobStore, StoredBlob,
};
use restorer_core::{ErrorKind, JobId, RestoreConfig, RestoreError};
use restorer_genai::{
    FailingImageModel, GenAiResult, GeneratedImage, ImageModel, ImageRequest, ModelReply,
    ResponsePart, StaticImageModel,
};
use serde_json::Value;
use tower::ServiceExt;

const BOUNDARY: &str = "----photo-restorer-boundary";
const PNG: &[u8] = b"\x89PNG\r\n\x1a\noriginal-pixels";

fn settings() -> RestorerSettings {
    RestorerSettings::from_config(&RestoreConfig::with_defaults().snapshot()).unwrap()
}

fn app_with_store(store: Arc<dyn BlobStore>, model: Option<Arc<dyn ImageModel>>) -> Router {
    build_with(settings(), store, model).ax.router
}

fn app(model: Option<Arc<dyn ImageModel>>) -> Router {
    app_with_store(Arc::new(MemoryBlobStore::new()), model)
}

fn image_model() -> StaticImageModel {
    StaticImageModel::new(
        "gemini-2.5-flash-image",
        ModelReply::new(vec![
            ResponsePart::Text("Here is the restored photo.".into()),
            ResponsePart::Image(GeneratedImage {
                mime_type: "image/webp".into(),
                data: Bytes::from_static(b"restored-pixels"),
            }),
        ]),
    )
}

fn text_only_model() -> StaticImageModel {
    StaticImageModel::new(
        "gemini-2.5-flash-image",
        ModelReply::new(vec![ResponsePart::Text(
            "I cannot restore this image.".into(),
        )]),
    )
}

fn multipart(file: Option<(&str, &[u8])>, texts: &[(&str, &str)]) -> Request<Body> {
    multipart_to("/upload", file, texts)
}

fn multipart_to(uri: &str, file: Option<(&str, &[u8])>, texts: &[(&str, &str)]) -> Request<Body> {
    let mut body = Vec::new();
    if let Some((mime, data)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"photo\"\r\nContent-Type: {mime}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    for (name, value) in texts {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(res: Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn raw_body(res: Response) -> Bytes {
    res.into_body().collect().await.unwrap().to_bytes()
}

async fn upload_png(app: &Router) -> String {
    let res = app
        .clone()
        .oneshot(multipart(Some(("image/png", PNG)), &[]))
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    json_body(res).await["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_ok() {
    let res = app(None).oneshot(get("/health")).await.unwrap();

    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(raw_body(res).await, Bytes::from_static(b"ok"));
}

#[tokio::test]
async fn responses_carry_request_id() {
    let res = app(None).oneshot(get("/health")).await.unwrap();
    assert!(res.headers().contains_key("x-request-id"));

    let req = Request::builder()
        .uri("/api/status")
        .header("x-request-id", "req-123")
        .body(Body::empty())
        .unwrap();
    let res = app(None).oneshot(req).await.unwrap();
    assert_eq!(res.status().as_u16(), 400);
    assert_eq!(res.headers()["x-request-id"], "req-123");
}

#[tokio::test]
async fn uploaded_original_is_served_back_unchanged() {
    let app = app(None);
    let id = upload_png(&app).await;

    let res = app
        .oneshot(get(&format!("/serve?id={id}&type=original")))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(res.headers()["content-type"], "image/png");
    assert_eq!(raw_body(res).await, Bytes::from_static(PNG));
}

#[tokio::test]
async fn serve_defaults_to_original() {
    let app = app(None);
    let id = upload_png(&app).await;

    let res = app.oneshot(get(&format!("/serve?id={id}"))).await.unwrap();
    assert_eq!(raw_body(res).await, Bytes::from_static(PNG));
}

#[tokio::test]
async fn upload_ids_are_fresh_uuids() {
    let app = app(None);
    let a = upload_png(&app).await;
    let b = upload_png(&app).await;

    assert_ne!(a, b);
    assert_eq!(a.len(), 36);
}

#[tokio::test]
async fn upload_without_image_is_bad_request() {
    let res = app(None)
        .oneshot(multipart(None, &[("note", "no file here")]))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 400);
    let body = json_body(res).await;
    assert_eq!(body["name"], "BadRequest");
    assert_eq!(body["message"], "No image uploaded");
}

#[tokio::test]
async fn upload_with_get_is_method_not_allowed() {
    let res = app(None).oneshot(get("/upload")).await.unwrap();

    assert_eq!(res.status().as_u16(), 405);
    assert_eq!(json_body(res).await["className"], "method-not-allowed");
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let mut settings = settings();
    settings.blob = settings.blob.clone().with_max_blob_bytes(8);
    let app = build_with(settings, Arc::new(MemoryBlobStore::new()), None).ax.router;

    let res = app
        .oneshot(multipart(Some(("image/png", PNG)), &[]))
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
}

#[tokio::test]
async fn unknown_id_is_not_found_everywhere() {
    let app = app(Some(Arc::new(image_model())));

    for uri in [
        "/status?id=does-not-exist",
        "/serve?id=does-not-exist&type=original",
        "/serve?id=does-not-exist&type=result",
    ] {
        let res = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(res.status().as_u16(), 404, "{uri}");
        assert_eq!(json_body(res).await["message"], "Not found");
    }
}

#[tokio::test]
async fn generating_for_unknown_id_is_not_found() {
    let service = RestorationsService::new(
        BlobAdapter::new(MemoryBlobStore::new(), settings().blob),
        Some(Arc::new(image_model())),
        Arc::new(settings()),
    );

    let err = service
        .generate_result(&JobId::from_string("missing"))
        .await
        .unwrap_err();
    assert_eq!(RestoreError::find(&err).unwrap().kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn missing_id_is_bad_request() {
    let app = app(None);
    for uri in ["/status", "/status?id=", "/serve", "/serve?type=result"] {
        let res = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(res.status().as_u16(), 400, "{uri}");
        assert_eq!(json_body(res).await["message"], "Missing ID");
    }
}

#[tokio::test]
async fn unknown_serve_type_is_bad_request() {
    let app = app(None);
    let id = upload_png(&app).await;

    let res = app
        .oneshot(get(&format!("/serve?id={id}&type=thumbnail")))
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
}

#[tokio::test]
async fn result_before_generation_falls_back_to_original() {
    let model = image_model();
    let app = app(Some(Arc::new(model.clone())));
    let id = upload_png(&app).await;

    let res = app
        .oneshot(get(&format!("/serve?id={id}&type=result")))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(res.headers()["content-type"], "image/png");
    assert_eq!(raw_body(res).await, Bytes::from_static(PNG));
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn status_generates_result_once() {
    let model = image_model();
    let app = app(Some(Arc::new(model.clone())));
    let id = upload_png(&app).await;

    let res = app
        .clone()
        .oneshot(get(&format!("/status?id={id}")))
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let body = json_body(res).await;
    assert_eq!(body["status"], "completed");
    assert_eq!(body["imageUrl"], format!("/api/serve?id={id}&type=result"));

    let res = app
        .clone()
        .oneshot(get(&format!("/api/status?id={id}")))
        .await
        .unwrap();
    assert_eq!(json_body(res).await["status"], "completed");
    assert_eq!(model.calls(), 1);

    let res = app
        .oneshot(get(&format!("/api/serve?id={id}&type=result")))
        .await
        .unwrap();
    assert_eq!(res.headers()["content-type"], "image/webp");
    assert_eq!(raw_body(res).await, Bytes::from_static(b"restored-pixels"));
}

#[tokio::test]
async fn racing_status_calls_share_one_generation() {
    let model = image_model().with_delay(Duration::from_millis(100));
    let app = app(Some(Arc::new(model.clone())));
    let id = upload_png(&app).await;

    let uri = format!("/status?id={id}");
    let (a, b) = tokio::join!(
        app.clone().oneshot(get(&uri)),
        app.clone().oneshot(get(&uri))
    );

    assert_eq!(json_body(a.unwrap()).await["status"], "completed");
    assert_eq!(json_body(b.unwrap()).await["status"], "completed");
    assert_eq!(model.calls(), 1);
}

/// Records the mime type of every request it receives.
#[derive(Clone, Default)]
struct MimeRecorder {
    seen: Arc<std::sync::Mutex<Vec<String>>>,
}

#[async_trait]
impl ImageModel for MimeRecorder {
    fn name(&self) -> &str {
        "mime-recorder"
    }

    async fn generate(&self, request: ImageRequest) -> GenAiResult<ModelReply> {
        self.seen.lock().unwrap().push(request.mime_type);
        Ok(ModelReply::new(vec![ResponsePart::Image(GeneratedImage {
            mime_type: "image/png".into(),
            data: Bytes::from_static(b"restored"),
        })]))
    }
}

fn untyped_file_request(uri: &str) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"scan\"\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(b"\xff\xd8\xffscan\r\n");
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn untyped_upload_is_sent_to_model_as_jpeg() {
    let model = MimeRecorder::default();
    let app = app(Some(Arc::new(model.clone())));

    let res = app
        .clone()
        .oneshot(untyped_file_request("/upload"))
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let id = json_body(res).await["id"].as_str().unwrap().to_string();

    let res = app
        .clone()
        .oneshot(get(&format!("/status?id={id}")))
        .await
        .unwrap();
    assert_eq!(json_body(res).await["status"], "completed");
    assert_eq!(*model.seen.lock().unwrap(), vec!["image/jpeg".to_string()]);

    let res = app
        .oneshot(get(&format!("/serve?id={id}&type=original")))
        .await
        .unwrap();
    assert_eq!(res.headers()["content-type"], "application/octet-stream");
}

#[tokio::test]
async fn untyped_restore_is_sent_to_model_as_jpeg() {
    let model = MimeRecorder::default();
    let res = app(Some(Arc::new(model.clone())))
        .oneshot(untyped_file_request("/restore"))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(*model.seen.lock().unwrap(), vec!["image/jpeg".to_string()]);
}

#[tokio::test]
async fn without_model_result_is_copy_of_original() {
    let store = MemoryBlobStore::new();
    let app = app_with_store(Arc::new(store.clone()), None);
    let id = upload_png(&app).await;

    let res = app
        .clone()
        .oneshot(get(&format!("/status?id={id}")))
        .await
        .unwrap();
    assert_eq!(json_body(res).await["status"], "completed");

    let res = app
        .oneshot(get(&format!("/serve?id={id}&type=result")))
        .await
        .unwrap();
    assert_eq!(res.headers()["content-type"], "image/png");
    assert_eq!(raw_body(res).await, Bytes::from_static(PNG));

    let meta = store
        .get_metadata(&format!("restorations/{id}-result"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(meta.get("generatedBy"), Some("gemini-fallback"));
}

#[tokio::test]
async fn failing_model_falls_back_to_original() {
    let model = FailingImageModel::new("upstream exploded");
    let app = app(Some(Arc::new(model.clone())));
    let id = upload_png(&app).await;

    let res = app
        .clone()
        .oneshot(get(&format!("/status?id={id}")))
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);

    let res = app
        .oneshot(get(&format!("/serve?id={id}&type=result")))
        .await
        .unwrap();
    assert_eq!(raw_body(res).await, Bytes::from_static(PNG));
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn text_only_reply_falls_back_to_original() {
    let store = MemoryBlobStore::new();
    let app = app_with_store(Arc::new(store.clone()), Some(Arc::new(text_only_model())));
    let id = upload_png(&app).await;

    app.oneshot(get(&format!("/status?id={id}"))).await.unwrap();

    let stored = store
        .get_with_metadata(&format!("restorations/{id}-result"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.data, Bytes::from_static(PNG));
    assert_eq!(stored.metadata.get("generatedBy"), Some("gemini-fallback"));
}

#[tokio::test]
async fn upload_records_job_metadata() {
    let store = MemoryBlobStore::new();
    let app = app_with_store(Arc::new(store.clone()), None);
    let id = upload_png(&app).await;

    let meta = store
        .get_metadata(&format!("restorations/{id}-original"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(meta.content_type(), Some("image/png"));
    assert_eq!(meta.get("status"), Some("processing"));
    assert!(meta.get("prompt").unwrap().starts_with("Ultra-realistic"));
    assert!(meta.get("uploadedAt").unwrap().ends_with('Z'));
}

struct BrokenStore;

#[async_trait]
impl BlobStore for BrokenStore {
    async fn set(&self, _key: &str, _data: Bytes, _metadata: BlobMetadata) -> BlobResult<()> {
        Err(BlobError::backend(std::io::Error::other("disk on fire at 10.1.2.3")))
    }

    async fn get_with_metadata(&self, _key: &str) -> BlobResult<Option<StoredBlob>> {
        Err(BlobError::backend(std::io::Error::other("disk on fire at 10.1.2.3")))
    }

    async fn get_metadata(&self, _key: &str) -> BlobResult<Option<BlobMetadata>> {
        Err(BlobError::backend(std::io::Error::other("disk on fire at 10.1.2.3")))
    }
}

#[tokio::test]
async fn storage_failures_are_generic_500s() {
    let app = app_with_store(Arc::new(BrokenStore), None);

    let res = app
        .clone()
        .oneshot(multipart(Some(("image/png", PNG)), &[]))
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 500);
    let body = json_body(res).await;
    assert_eq!(body["message"], "Upload failed");
    assert!(!body.to_string().contains("10.1.2.3"));

    let res = app.clone().oneshot(get("/status?id=x")).await.unwrap();
    assert_eq!(res.status().as_u16(), 500);
    assert_eq!(json_body(res).await["message"], "Check failed");

    let res = app.oneshot(get("/serve?id=x")).await.unwrap();
    assert_eq!(res.status().as_u16(), 500);
    assert_eq!(json_body(res).await["message"], "Error serving image");
}

#[tokio::test]
async fn restore_returns_inline_data_url() {
    let res = app(Some(Arc::new(image_model())))
        .oneshot(multipart_to(
            "/api/restore",
            Some(("image/jpeg", &b"jpeg-bytes"[..])),
            &[("prompt", "colorize")],
        ))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 200);
    let body = json_body(res).await;
    assert_eq!(body["success"], true);
    // base64("restored-pixels")
    assert_eq!(body["imageUrl"], "data:image/webp;base64,cmVzdG9yZWQtcGl4ZWxz");
    assert_eq!(body["text"], "Here is the restored photo.");
    assert_eq!(body["model"], "gemini-2.5-flash-image");
}

#[tokio::test]
async fn restore_text_only_reply_is_unprocessable() {
    let res = app(Some(Arc::new(text_only_model())))
        .oneshot(multipart_to("/restore", Some(("image/jpeg", &b"jpeg-bytes"[..])), &[]))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 422);
    let body = json_body(res).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "No image was generated");
    assert_eq!(body["text"], "I cannot restore this image.");
}

#[tokio::test]
async fn restore_without_credential_is_500() {
    let res = app(None)
        .oneshot(multipart_to("/restore", Some(("image/jpeg", &b"jpeg-bytes"[..])), &[]))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 500);
    let body = json_body(res).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Gemini API key not configured");
}

#[tokio::test]
async fn restore_model_failure_reports_details() {
    let res = app(Some(Arc::new(FailingImageModel::new("quota exceeded"))))
        .oneshot(multipart_to("/restore", Some(("image/jpeg", &b"jpeg-bytes"[..])), &[]))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 500);
    let body = json_body(res).await;
    assert_eq!(body["error"], "Failed to process image");
    assert!(body["details"].as_str().unwrap().contains("quota exceeded"));
}

#[tokio::test]
async fn restore_without_image_is_bad_request() {
    let res = app(Some(Arc::new(image_model())))
        .oneshot(multipart_to("/restore", None, &[("prompt", "x")]))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 400);
    assert_eq!(json_body(res).await["error"], "No image uploaded");
}

#[tokio::test]
async fn restore_never_touches_storage() {
    let store = MemoryBlobStore::new();
    let app = app_with_store(Arc::new(store.clone()), Some(Arc::new(image_model())));

    app.oneshot(multipart_to("/restore", Some(("image/jpeg", &b"jpeg-bytes"[..])), &[]))
        .await
        .unwrap();
    assert!(store.is_empty());
}
