//! Handlers for the `/studies/{study_id}/jobs` resource.
//!
//! Submission writes the PENDING row and publishes the matching status
//! event; every later transition is owned by the executor's poll loop and
//! the handlers it dispatches to. Cancellation only works while a job is
//! still PENDING -- once claimed, a job runs to completion.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use cohort_core::error::CoreError;
use cohort_core::types::DbId;
use cohort_db::models::job::{Job, JobListQuery, SubmitJob};
use cohort_db::models::status::JobStatus;
use cohort_db::repositories::{JobRepo, ProjectRepo};
use cohort_db::DbPool;
use cohort_events::JobStatusEvent;

use crate::access::{ensure_study_manager, ensure_study_member};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_in_study(pool: &DbPool, study_id: DbId, job_id: DbId) -> AppResult<Job> {
    let job = JobRepo::find_by_id(pool, job_id)
        .await?
        .filter(|j| j.study_id == study_id)
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: job_id,
        }))?;
    Ok(job)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/studies/{study_id}/jobs
///
/// Submit a curation job (any member). The job starts PENDING and is
/// picked up by the curation loop; a type with no registered handler ends
/// up UNPROCESSED rather than being rejected here, so old clients keep
/// working across executor rollouts. Returns 201.
pub async fn submit_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(study_id): Path<DbId>,
    Json(input): Json<SubmitJob>,
) -> AppResult<impl IntoResponse> {
    ensure_study_member(&state.pool, &auth, study_id).await?;

    if input.job_type.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "job_type must not be empty".into(),
        )));
    }
    if let Some(project_id) = input.project_id {
        let project = ProjectRepo::find_by_id(&state.pool, project_id)
            .await?
            .filter(|p| p.study_id == study_id);
        if project.is_none() {
            return Err(AppError::Core(CoreError::NotFound {
                entity: "Project",
                id: project_id,
            }));
        }
    }

    let job = JobRepo::submit(&state.pool, auth.user_id, study_id, &input).await?;

    state.event_bus.publish(JobStatusEvent::new(
        job.id,
        job.study_id,
        &job.job_type,
        JobStatus::Pending.name(),
    ));

    tracing::info!(
        job_id = job.id,
        job_type = %job.job_type,
        study_id,
        requested_by = auth.user_id,
        "Job submitted",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: job })))
}

/// GET /api/v1/studies/{study_id}/jobs
///
/// List the study's jobs, newest first, with optional status filter and
/// pagination.
pub async fn list_jobs(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(study_id): Path<DbId>,
    Query(query): Query<JobListQuery>,
) -> AppResult<Json<DataResponse<Vec<Job>>>> {
    ensure_study_member(&state.pool, &auth, study_id).await?;
    let jobs = JobRepo::list_for_study(&state.pool, study_id, &query).await?;
    Ok(Json(DataResponse { data: jobs }))
}

/// GET /api/v1/studies/{study_id}/jobs/{job_id}
pub async fn get_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((study_id, job_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DataResponse<Job>>> {
    ensure_study_member(&state.pool, &auth, study_id).await?;
    let job = find_in_study(&state.pool, study_id, job_id).await?;
    Ok(Json(DataResponse { data: job }))
}

/// POST /api/v1/studies/{study_id}/jobs/{job_id}/cancel
///
/// Cancel a PENDING job. Allowed for the requester, study managers, and
/// admins. A job that has already been claimed cannot be cancelled.
/// Returns 204.
pub async fn cancel_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((study_id, job_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    ensure_study_member(&state.pool, &auth, study_id).await?;
    let job = find_in_study(&state.pool, study_id, job_id).await?;

    if job.requested_by != auth.user_id {
        // Not the requester: needs manage rights on the study.
        ensure_study_manager(&state.pool, &auth, study_id).await?;
    }

    let cancelled = JobRepo::cancel(&state.pool, job_id).await?;
    if !cancelled {
        return Err(AppError::Core(CoreError::Conflict(
            "Only pending jobs can be cancelled".into(),
        )));
    }

    tracing::info!(job_id, study_id, cancelled_by = auth.user_id, "Job cancelled");
    Ok(StatusCode::NO_CONTENT)
}
