//! Field dictionary entity model and DTOs.

use cohort_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::status::StatusId;

/// A field-dictionary row from the `fields` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Field {
    pub id: DbId,
    pub study_id: DbId,
    /// External code used in data uploads (the CSV header cell).
    pub field_code: String,
    pub field_name: String,
    pub data_type_id: StatusId,
    pub unit: Option<String>,
    /// Categorical fields: JSON object mapping value code to description.
    pub possible_values: Option<serde_json::Value>,
    pub comments: Option<String>,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a field-dictionary entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateField {
    pub field_code: String,
    pub field_name: String,
    pub data_type_id: StatusId,
    pub unit: Option<String>,
    pub possible_values: Option<serde_json::Value>,
    pub comments: Option<String>,
}

/// DTO for updating a field-dictionary entry. All fields are optional.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateField {
    pub field_name: Option<String>,
    pub data_type_id: Option<StatusId>,
    pub unit: Option<String>,
    pub possible_values: Option<serde_json::Value>,
    pub comments: Option<String>,
}
