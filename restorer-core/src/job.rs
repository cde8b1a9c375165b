use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata keys stored alongside job blobs.
pub mod meta {
    pub const CONTENT_TYPE: &str = "contentType";
    pub const UPLOADED_AT: &str = "uploadedAt";
    pub const STATUS: &str = "status";
    pub const PROMPT: &str = "prompt";
    pub const GENERATED_BY: &str = "generatedBy";
}

/// `generatedBy` tag of a result that is a copy of the original.
pub const FALLBACK_GENERATOR: &str = "gemini-fallback";

/// Status written on the original at upload time. Informational only.
pub const UPLOAD_STATUS: &str = "processing";

/// Identifier of a restoration job, used as the prefix of its blob keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Generate a new random job ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an id received from a client. Ids are opaque and case-sensitive.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Blob key of the given variant, e.g. `{id}-original`.
    pub fn key(&self, variant: BlobVariant) -> String {
        format!("{}-{}", self.0, variant.as_str())
    }

    pub fn original_key(&self) -> String {
        self.key(BlobVariant::Original)
    }

    pub fn result_key(&self) -> String {
        self.key(BlobVariant::Result)
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which of the two blobs of a job is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobVariant {
    #[default]
    Original,
    Result,
}

impl BlobVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlobVariant::Original => "original",
            BlobVariant::Result => "result",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "original" => Some(BlobVariant::Original),
            "result" => Some(BlobVariant::Result),
            _ => None,
        }
    }
}

/// Externally visible job state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Completed,
}

/// Body of a status response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub status: JobStatus,
    pub image_url: Option<String>,
}

impl StatusReport {
    pub fn processing() -> Self {
        Self {
            status: JobStatus::Processing,
            image_url: None,
        }
    }

    pub fn completed(image_url: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Completed,
            image_url: Some(image_url.into()),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == JobStatus::Completed
    }
}

/// Relative URL of the serve endpoint for a job blob.
pub fn serve_url(prefix: &str, id: &JobId, variant: BlobVariant) -> String {
    format!(
        "{}/serve?id={}&type={}",
        prefix.trim_end_matches('/'),
        id,
        variant.as_str()
    )
}

/// Current time in the ISO-8601 form used for `uploadedAt`.
pub fn timestamp_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_use_id_prefix() {
        let id = JobId::from_string("AbC-1");
        assert_eq!(id.original_key(), "AbC-1-original");
        assert_eq!(id.result_key(), "AbC-1-result");
    }

    #[test]
    fn generated_ids_are_uuid_v4() {
        let id = JobId::new();
        let parsed = Uuid::parse_str(id.as_str()).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
        assert_ne!(JobId::new(), id);
    }

    #[test]
    fn variant_parsing_is_strict() {
        assert_eq!(BlobVariant::parse("result"), Some(BlobVariant::Result));
        assert_eq!(BlobVariant::parse("Result"), None);
        assert_eq!(BlobVariant::default(), BlobVariant::Original);
    }

    #[test]
    fn status_report_shape() {
        let id = JobId::from_string("j1");
        let report = StatusReport::completed(serve_url("/api/", &id, BlobVariant::Result));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["imageUrl"], "/api/serve?id=j1&type=result");

        let json = serde_json::to_value(StatusReport::processing()).unwrap();
        assert_eq!(json["status"], "processing");
        assert!(json["imageUrl"].is_null());
    }

    #[test]
    fn timestamps_are_utc_millis() {
        let ts = timestamp_now();
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}
