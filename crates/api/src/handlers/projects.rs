//! Handlers for the `/studies/{study_id}/projects` resource.
//!
//! A project is a named window onto a study's field dictionary. The
//! approved-field list is validated against the study's live fields on
//! every write so a mask can never reference a field from another study.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use cohort_core::error::CoreError;
use cohort_core::types::DbId;
use cohort_db::models::project::{CreateProject, EditApprovedFields, Project};
use cohort_db::repositories::{FieldRepo, ProjectRepo};
use cohort_db::DbPool;

use crate::access::{ensure_study_manager, ensure_study_member};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fetch a project and verify it belongs to `study_id`.
///
/// A project reached through the wrong study's URL is a 404, not a leak.
async fn find_in_study(pool: &DbPool, study_id: DbId, project_id: DbId) -> AppResult<Project> {
    let project = ProjectRepo::find_by_id(pool, project_id)
        .await?
        .filter(|p| p.study_id == study_id)
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id: project_id,
        }))?;
    Ok(project)
}

/// Reject approved-field lists that reference fields outside the study.
async fn validate_approved_fields(
    pool: &DbPool,
    study_id: DbId,
    approved: &Option<Vec<DbId>>,
) -> AppResult<()> {
    let Some(ids) = approved else { return Ok(()) };

    let fields = FieldRepo::list_for_study(pool, study_id).await?;
    let known: std::collections::HashSet<DbId> = fields.iter().map(|f| f.id).collect();

    let unknown: Vec<DbId> = ids.iter().copied().filter(|id| !known.contains(id)).collect();
    if !unknown.is_empty() {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Approved fields reference unknown field ids: {unknown:?}"
        ))));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/studies/{study_id}/projects
pub async fn list_projects(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(study_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Project>>>> {
    ensure_study_member(&state.pool, &auth, study_id).await?;
    let projects = ProjectRepo::list_for_study(&state.pool, study_id).await?;
    Ok(Json(DataResponse { data: projects }))
}

/// POST /api/v1/studies/{study_id}/projects
///
/// Create a project (manager or admin). Returns 201.
pub async fn create_project(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(study_id): Path<DbId>,
    Json(input): Json<CreateProject>,
) -> AppResult<impl IntoResponse> {
    ensure_study_manager(&state.pool, &auth, study_id).await?;

    if input.name.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Project name must not be empty".into(),
        )));
    }
    validate_approved_fields(&state.pool, study_id, &input.approved_fields).await?;

    let project = ProjectRepo::create(&state.pool, study_id, auth.user_id, &input).await?;

    tracing::info!(
        study_id,
        project_id = project.id,
        name = %project.name,
        created_by = auth.user_id,
        "Project created",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: project })))
}

/// GET /api/v1/studies/{study_id}/projects/{project_id}
pub async fn get_project(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((study_id, project_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DataResponse<Project>>> {
    ensure_study_member(&state.pool, &auth, study_id).await?;
    let project = find_in_study(&state.pool, study_id, project_id).await?;
    Ok(Json(DataResponse { data: project }))
}

/// PUT /api/v1/studies/{study_id}/projects/{project_id}/approved-fields
///
/// Replace the approved-field list (manager or admin). Sending `null`
/// clears the restriction.
pub async fn set_approved_fields(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((study_id, project_id)): Path<(DbId, DbId)>,
    Json(input): Json<EditApprovedFields>,
) -> AppResult<Json<DataResponse<Project>>> {
    ensure_study_manager(&state.pool, &auth, study_id).await?;
    find_in_study(&state.pool, study_id, project_id).await?;
    validate_approved_fields(&state.pool, study_id, &input.approved_fields).await?;

    let project = ProjectRepo::set_approved_fields(&state.pool, project_id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id: project_id,
        }))?;

    tracing::info!(
        study_id,
        project_id,
        updated_by = auth.user_id,
        "Approved fields updated",
    );

    Ok(Json(DataResponse { data: project }))
}

/// DELETE /api/v1/studies/{study_id}/projects/{project_id}
///
/// Soft-delete a project (manager or admin). Returns 204.
pub async fn delete_project(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((study_id, project_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    ensure_study_manager(&state.pool, &auth, study_id).await?;
    find_in_study(&state.pool, study_id, project_id).await?;

    let deleted = ProjectRepo::soft_delete(&state.pool, project_id).await?;
    if !deleted {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id: project_id,
        }));
    }

    tracing::info!(study_id, project_id, deleted_by = auth.user_id, "Project deleted");
    Ok(StatusCode::NO_CONTENT)
}
