//! Curated datapoint model and query DTOs.

use cohort_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `data_records` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DataRecord {
    pub id: DbId,
    pub study_id: DbId,
    pub data_version_id: DbId,
    pub subject_id: String,
    pub visit_id: String,
    pub field_id: DbId,
    pub value: serde_json::Value,
    pub source_file_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// One datapoint produced by CSV curation, before insertion.
#[derive(Debug, Clone)]
pub struct NewDataRecord {
    pub subject_id: String,
    pub visit_id: String,
    pub field_id: DbId,
    pub value: serde_json::Value,
}

/// Query parameters for `GET /api/v1/studies/{id}/data`.
#[derive(Debug, Default, Deserialize)]
pub struct DataRecordFilter {
    pub subject_id: Option<String>,
    pub visit_id: Option<String>,
    pub field_id: Option<DbId>,
    /// Pin to a specific data version; defaults to the study's current one.
    pub data_version_id: Option<DbId>,
    /// Maximum number of results. Defaults to 1000, capped at 10000.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

/// Body for `DELETE /api/v1/studies/{id}/data`.
///
/// Deletion is scoped to the current (or pinned) data version; at least
/// one of the three filters must be present.
#[derive(Debug, Deserialize)]
pub struct DeleteDataRecords {
    pub subject_id: Option<String>,
    pub visit_id: Option<String>,
    pub field_id: Option<DbId>,
    pub data_version_id: Option<DbId>,
}
