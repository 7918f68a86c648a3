//! Project entity model and DTOs.
//!
//! A project is a named window onto a study: when `approved_fields` is
//! set, data queries routed through the project only see those fields.

use cohort_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A project row from the `projects` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Project {
    pub id: DbId,
    pub study_id: DbId,
    pub name: String,
    pub created_by: DbId,
    /// Field ids visible through this project; `None` means unrestricted.
    pub approved_fields: Option<Vec<DbId>>,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new project.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProject {
    pub name: String,
    pub approved_fields: Option<Vec<DbId>>,
}

/// DTO for replacing a project's approved-field list.
///
/// `None` clears the restriction entirely.
#[derive(Debug, Clone, Deserialize)]
pub struct EditApprovedFields {
    pub approved_fields: Option<Vec<DbId>>,
}
