//! Uploaded-file metadata model and DTOs.

use cohort_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A file-metadata row from the `files` table.
///
/// The bytes themselves live in the file store under `uri`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StudyFile {
    pub id: DbId,
    pub study_id: DbId,
    pub file_name: String,
    /// Uploader-provided metadata; device uploads carry the parsed
    /// participant/device/date fields here.
    pub description: Option<serde_json::Value>,
    pub file_size: i64,
    /// SHA-256 of the content, hex encoded.
    pub content_hash: String,
    /// Key into the file store.
    pub uri: String,
    pub uploaded_by: DbId,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for recording an uploaded file.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateStudyFile {
    pub file_name: String,
    pub description: Option<serde_json::Value>,
    pub file_size: i64,
    pub content_hash: String,
    pub uri: String,
}
