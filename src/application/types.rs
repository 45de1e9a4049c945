use serde::{Deserialize, Serialize};

use crate::domain::{DecideAction, Record, RecordStatus};

/// Request to create a record. Unknown fields are rejected at the boundary
/// rather than persisted implicitly.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitRequest {
    /// Caller-supplied record id; unique across the store
    pub id: String,
    /// Patient name or contact; opaque to the service
    pub patient_ref: String,
    /// Uploading organization; opaque to the service
    pub holder_ref: String,
    /// Uploaded files, in fingerprint order
    pub files: Vec<FileUpload>,
    /// Optional client claim of a prior on-chain attestation; both fields
    /// must be present together
    #[serde(default)]
    pub claimed_fingerprint: Option<String>,
    #[serde(default)]
    pub claimed_attestation_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileUpload {
    pub name: String,
    /// MIME type (e.g., "application/pdf", "text/plain")
    pub mime_type: String,
    /// Base64-encoded file content
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub id: String,
    pub status: RecordStatus,
    pub fingerprint: String,
}

/// Admin decision on a pending record.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DecideRequest {
    pub action: DecideAction,
    pub decided_by: String,
}

#[derive(Debug, Serialize)]
pub struct DecideResponse {
    pub status: RecordStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attestation_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecordList {
    pub records: Vec<Record>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}
