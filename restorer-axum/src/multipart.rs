use std::collections::{HashMap, HashSet};

use axum::body::Body;
use axum::http::{header, HeaderMap};
use bytes::Bytes;
use restorer_core::RestoreError;

/// Limits applied while reading a multipart body.
#[derive(Debug, Clone)]
pub struct MultipartConfig {
    /// Maximum size of a single field in bytes (None = unlimited)
    pub max_file_size: Option<u64>,
    /// Maximum size of the whole body in bytes
    pub max_total_size: u64,
    /// Allowed content types for files (empty = all allowed)
    pub allowed_content_types: HashSet<String>,
}

impl Default for MultipartConfig {
    fn default() -> Self {
        Self {
            max_file_size: Some(20 * 1024 * 1024),
            max_total_size: 25 * 1024 * 1024,
            allowed_content_types: HashSet::new(),
        }
    }
}

impl MultipartConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = Some(size);
        self
    }

    pub fn max_total_size(mut self, size: u64) -> Self {
        self.max_total_size = size;
        self
    }

    pub fn allow_content_type(mut self, content_type: &str) -> Self {
        self.allowed_content_types.insert(content_type.to_string());
        self
    }
}

/// A file field read fully into memory.
#[derive(Debug, Clone)]
pub struct FormFile {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Parsed form: file fields and text fields by name. When a name repeats,
/// the first occurrence is kept.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub files: HashMap<String, FormFile>,
    pub texts: HashMap<String, String>,
}

impl MultipartForm {
    pub fn file(&self, name: &str) -> Option<&FormFile> {
        self.files.get(name)
    }

    pub fn take_file(&mut self, name: &str) -> Option<FormFile> {
        self.files.remove(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.texts.get(name).map(String::as_str)
    }
}

fn multipart_error(err: multer::Error) -> anyhow::Error {
    let message = match err {
        multer::Error::StreamSizeExceeded { .. } | multer::Error::FieldSizeExceeded { .. } => {
            "Upload exceeds the maximum allowed size".to_string()
        }
        other => format!("Failed to parse multipart data: {other}"),
    };
    RestoreError::bad_request(message).into_anyhow()
}

/// Read a `multipart/form-data` body.
///
/// Fields with a filename or a non-text content type are files, everything
/// else is text. File inputs submitted empty (no filename, no bytes) are
/// skipped.
pub async fn read_multipart(
    headers: &HeaderMap,
    body: Body,
    config: &MultipartConfig,
) -> anyhow::Result<MultipartForm> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let boundary = multer::parse_boundary(content_type).map_err(|_| {
        RestoreError::bad_request("Expected a multipart/form-data body").into_anyhow()
    })?;

    let mut limit = multer::SizeLimit::new().whole_stream(config.max_total_size);
    if let Some(max) = config.max_file_size {
        limit = limit.per_field(max);
    }

    let mut multipart = multer::Multipart::with_constraints(
        body.into_data_stream(),
        boundary,
        multer::Constraints::new().size_limit(limit),
    );

    let mut form = MultipartForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("unknown").to_string();
        let filename = field.file_name().filter(|f| !f.is_empty()).map(str::to_string);
        let content_type = field.content_type().map(|m| m.essence_str().to_string());

        let is_text = filename.is_none()
            && content_type.as_deref().map_or(true, |ct| ct.starts_with("text/"));
        if is_text {
            let value = field.text().await.map_err(multipart_error)?;
            form.texts.entry(name).or_insert(value);
            continue;
        }

        let data = field.bytes().await.map_err(multipart_error)?;
        if filename.is_none() && data.is_empty() {
            continue;
        }

        if let Some(ct) = &content_type {
            if !config.allowed_content_types.is_empty() && !config.allowed_content_types.contains(ct)
            {
                return Err(RestoreError::bad_request(format!(
                    "Content type '{ct}' not allowed for field '{name}'"
                ))
                .into_anyhow());
            }
        }

        tracing::debug!(field = %name, bytes = data.len(), "multipart file field");
        form.files.entry(name).or_insert(FormFile {
            filename,
            content_type,
            data,
        });
    }

    Ok(form)
}
