//! Study membership model and DTOs.

use cohort_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `study_members` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StudyMember {
    pub id: DbId,
    pub study_id: DbId,
    pub user_id: DbId,
    /// Managers may add/remove members and manage study-level resources.
    pub can_manage: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Membership joined with the member's username for listing.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StudyMemberInfo {
    pub id: DbId,
    pub study_id: DbId,
    pub user_id: DbId,
    pub username: String,
    pub can_manage: bool,
    pub created_at: Timestamp,
}

/// DTO for adding a member to a study.
#[derive(Debug, Clone, Deserialize)]
pub struct AddStudyMember {
    pub user_id: DbId,
    /// Defaults to `false`.
    pub can_manage: Option<bool>,
}
