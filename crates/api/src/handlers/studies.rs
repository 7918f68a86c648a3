//! Handlers for the `/studies` resource: study CRUD, membership, and data
//! versions.
//!
//! Creation and hard administrative actions are admin-only; day-to-day
//! management (members, versions) needs a membership row with `can_manage`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use cohort_core::error::CoreError;
use cohort_core::types::DbId;
use cohort_db::models::status::StudyType;
use cohort_db::models::study::{CreateDataVersion, CreateStudy, Study, UpdateStudy};
use cohort_db::models::study_member::AddStudyMember;
use cohort_db::repositories::{StudyMemberRepo, StudyRepo, UserRepo};

use crate::access::{ensure_study_manager, ensure_study_member};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Studies
// ---------------------------------------------------------------------------

/// GET /api/v1/studies
///
/// Admins see every live study; everyone else sees studies they belong to.
pub async fn list_studies(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<Study>>>> {
    let studies = if auth.is_admin() {
        StudyRepo::list_all(&state.pool).await?
    } else {
        StudyRepo::list_for_user(&state.pool, auth.user_id).await?
    };
    Ok(Json(DataResponse { data: studies }))
}

/// POST /api/v1/studies
///
/// Create a study (admin only). The creator is added as a managing member
/// so the study is usable without a second request. Returns 201.
pub async fn create_study(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateStudy>,
) -> AppResult<impl IntoResponse> {
    if input.name.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Study name must not be empty".into(),
        )));
    }
    if let Some(type_id) = input.study_type_id {
        if StudyType::from_id(type_id).is_none() {
            return Err(AppError::Core(CoreError::Validation(format!(
                "Unknown study type id {type_id}"
            ))));
        }
    }
    if StudyRepo::find_by_name(&state.pool, &input.name).await?.is_some() {
        return Err(AppError::Core(CoreError::Conflict(
            "Study name already in use".into(),
        )));
    }

    let study = StudyRepo::create(&state.pool, admin.user_id, &input).await?;
    StudyMemberRepo::add(
        &state.pool,
        study.id,
        &AddStudyMember { user_id: admin.user_id, can_manage: Some(true) },
    )
    .await?;

    tracing::info!(
        study_id = study.id,
        name = %study.name,
        created_by = admin.user_id,
        "Study created",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: study })))
}

/// GET /api/v1/studies/{study_id}
pub async fn get_study(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(study_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Study>>> {
    let study = ensure_study_member(&state.pool, &auth, study_id).await?;
    Ok(Json(DataResponse { data: study }))
}

/// PUT /api/v1/studies/{study_id}
///
/// Edit the study description (manager or admin).
pub async fn update_study(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(study_id): Path<DbId>,
    Json(input): Json<UpdateStudy>,
) -> AppResult<Json<DataResponse<Study>>> {
    ensure_study_manager(&state.pool, &auth, study_id).await?;

    let study = StudyRepo::update(&state.pool, study_id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Study",
            id: study_id,
        }))?;

    tracing::info!(study_id, updated_by = auth.user_id, "Study updated");
    Ok(Json(DataResponse { data: study }))
}

/// DELETE /api/v1/studies/{study_id}
///
/// Soft-delete a study (admin only). Curated data and files stay in place
/// for audit; the name becomes reusable. Returns 204.
pub async fn delete_study(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(study_id): Path<DbId>,
) -> AppResult<StatusCode> {
    let deleted = StudyRepo::soft_delete(&state.pool, study_id).await?;
    if !deleted {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Study",
            id: study_id,
        }));
    }

    tracing::info!(study_id, deleted_by = admin.user_id, "Study deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Members
// ---------------------------------------------------------------------------

/// GET /api/v1/studies/{study_id}/members
pub async fn list_members(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(study_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    ensure_study_member(&state.pool, &auth, study_id).await?;
    let members = StudyMemberRepo::list_for_study(&state.pool, study_id).await?;
    Ok(Json(DataResponse { data: members }))
}

/// POST /api/v1/studies/{study_id}/members
///
/// Add a member (manager or admin). Adding an existing member updates the
/// `can_manage` flag in place. Returns 201.
pub async fn add_member(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(study_id): Path<DbId>,
    Json(input): Json<AddStudyMember>,
) -> AppResult<impl IntoResponse> {
    ensure_study_manager(&state.pool, &auth, study_id).await?;

    let target = UserRepo::find_by_id(&state.pool, input.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: input.user_id,
        }))?;
    if !target.is_active {
        return Err(AppError::Core(CoreError::Validation(
            "Cannot add a deactivated user to a study".into(),
        )));
    }

    let member = StudyMemberRepo::add(&state.pool, study_id, &input).await?;

    tracing::info!(
        study_id,
        member_user_id = input.user_id,
        added_by = auth.user_id,
        "Study member added",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: member })))
}

/// DELETE /api/v1/studies/{study_id}/members/{user_id}
///
/// Remove a member (manager or admin). Returns 204.
pub async fn remove_member(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((study_id, user_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    ensure_study_manager(&state.pool, &auth, study_id).await?;

    let removed = StudyMemberRepo::remove(&state.pool, study_id, user_id).await?;
    if !removed {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Study member",
            id: user_id,
        }));
    }

    tracing::info!(
        study_id,
        member_user_id = user_id,
        removed_by = auth.user_id,
        "Study member removed",
    );

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Data versions
// ---------------------------------------------------------------------------

/// GET /api/v1/studies/{study_id}/data-versions
pub async fn list_data_versions(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(study_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    ensure_study_member(&state.pool, &auth, study_id).await?;
    let versions = StudyRepo::list_data_versions(&state.pool, study_id).await?;
    Ok(Json(DataResponse { data: versions }))
}

/// POST /api/v1/studies/{study_id}/data-versions
///
/// Create a data version (manager or admin). The version label must be
/// unique within the study. Returns 201.
pub async fn create_data_version(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(study_id): Path<DbId>,
    Json(input): Json<CreateDataVersion>,
) -> AppResult<impl IntoResponse> {
    ensure_study_manager(&state.pool, &auth, study_id).await?;

    if input.version.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Version label must not be empty".into(),
        )));
    }

    let version = StudyRepo::create_data_version(&state.pool, study_id, &input).await?;

    tracing::info!(
        study_id,
        version_id = version.id,
        version = %version.version,
        created_by = auth.user_id,
        "Data version created",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: version })))
}

/// POST /api/v1/studies/{study_id}/data-versions/{version_id}/current
///
/// Point the study's read pointer at this version (manager or admin).
/// Queries and the data API only ever see the current version unless a
/// caller pins an explicit one.
pub async fn set_current_data_version(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((study_id, version_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    ensure_study_manager(&state.pool, &auth, study_id).await?;

    let updated = StudyRepo::set_current_data_version(&state.pool, study_id, version_id).await?;
    if !updated {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Data version",
            id: version_id,
        }));
    }

    tracing::info!(
        study_id,
        version_id,
        set_by = auth.user_id,
        "Current data version set",
    );

    Ok(StatusCode::NO_CONTENT)
}
