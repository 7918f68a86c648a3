//! Saved cohort query entity model and DTOs.

use cohort_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::StatusId;

/// A row from the `queries` table.
///
/// Execution is asynchronous: creating a query spawns a `QUERY_EXECUTION`
/// job, and the handler writes `result` back onto this row.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SavedQuery {
    pub id: DbId,
    pub study_id: DbId,
    pub project_id: Option<DbId>,
    pub name: String,
    /// Filter/projection document; schema owned by the query-execution
    /// handler.
    pub query: serde_json::Value,
    pub requested_by: DbId,
    pub status_id: StatusId,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a saved query.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateQuery {
    pub name: String,
    pub project_id: Option<DbId>,
    pub query: serde_json::Value,
}
