//! Study-scoped authorization helpers.
//!
//! Every study-scoped route funnels through one of these: they load the
//! study, 404 on a missing or soft-deleted id, and check the caller's
//! membership row. Admins bypass membership entirely.

use cohort_core::error::CoreError;
use cohort_core::types::DbId;
use cohort_db::models::study::Study;
use cohort_db::repositories::{StudyMemberRepo, StudyRepo};
use cohort_db::DbPool;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;

/// Fetch a study by ID and verify the caller can read it.
///
/// Membership (any role on the study) or the platform admin role is
/// required. Returns the study so callers avoid a second fetch.
pub async fn ensure_study_member(
    pool: &DbPool,
    auth: &AuthUser,
    study_id: DbId,
) -> AppResult<Study> {
    let study = find_study(pool, study_id).await?;

    if auth.is_admin() {
        return Ok(study);
    }

    let member = StudyMemberRepo::find(pool, study_id, auth.user_id).await?;
    if member.is_none() {
        return Err(AppError::Core(CoreError::Forbidden(
            "Not a member of this study".into(),
        )));
    }

    Ok(study)
}

/// Fetch a study by ID and verify the caller can manage it.
///
/// Requires a membership row with `can_manage`, or the platform admin role.
pub async fn ensure_study_manager(
    pool: &DbPool,
    auth: &AuthUser,
    study_id: DbId,
) -> AppResult<Study> {
    let study = find_study(pool, study_id).await?;

    if auth.is_admin() {
        return Ok(study);
    }

    let member = StudyMemberRepo::find(pool, study_id, auth.user_id).await?;
    match member {
        Some(m) if m.can_manage => Ok(study),
        Some(_) => Err(AppError::Core(CoreError::Forbidden(
            "Managing this study requires the can_manage flag".into(),
        ))),
        None => Err(AppError::Core(CoreError::Forbidden(
            "Not a member of this study".into(),
        ))),
    }
}

async fn find_study(pool: &DbPool, study_id: DbId) -> AppResult<Study> {
    StudyRepo::find_by_id(pool, study_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Study",
            id: study_id,
        }))
}
