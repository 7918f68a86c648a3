//! Study entity models and DTOs, including data versions.

use cohort_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::status::StatusId;

/// A study row from the `studies` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Study {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub study_type_id: StatusId,
    pub created_by: DbId,
    /// Points at the version curated data is read from. `None` until the
    /// first curation job finishes.
    pub current_data_version_id: Option<DbId>,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new study.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateStudy {
    pub name: String,
    pub description: Option<String>,
    /// Defaults to 3 (ANY) if omitted.
    pub study_type_id: Option<StatusId>,
}

/// DTO for editing a study. All fields are optional.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStudy {
    pub description: Option<String>,
}

/// A row from the `study_data_versions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StudyDataVersion {
    pub id: DbId,
    pub study_id: DbId,
    /// Human-facing version label, unique per study (e.g. `"1.2"`).
    pub version: String,
    pub tag: Option<String>,
    pub content_id: Uuid,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new data version.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDataVersion {
    pub version: String,
    pub tag: Option<String>,
}
