//! Curation job entity models and DTOs.

use cohort_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::StatusId;

/// A row from the `jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: DbId,
    pub job_type: String,
    pub status_id: StatusId,
    pub study_id: DbId,
    pub project_id: Option<DbId>,
    pub requested_by: DbId,
    /// Handler-owned payload; the dispatcher never looks inside.
    pub payload: serde_json::Value,
    pub result: Option<serde_json::Value>,
    /// JSON array of error messages.
    pub error: Option<serde_json::Value>,
    pub cancelled: bool,
    pub cancelled_at: Option<Timestamp>,
    pub claimed_by: Option<String>,
    pub claimed_at: Option<Timestamp>,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for submitting a new job via `POST /api/v1/studies/{id}/jobs`.
#[derive(Debug, Deserialize)]
pub struct SubmitJob {
    pub job_type: String,
    pub project_id: Option<DbId>,
    pub payload: serde_json::Value,
}

/// Query parameters for `GET /api/v1/studies/{id}/jobs`.
#[derive(Debug, Default, Deserialize)]
pub struct JobListQuery {
    /// Filter by status ID (e.g. 1 = PENDING, 4 = ERROR).
    pub status_id: Option<StatusId>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}
