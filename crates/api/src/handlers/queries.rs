//! Handlers for the `/studies/{study_id}/queries` resource.
//!
//! Creating a query saves the row in SAVED state and immediately submits a
//! `QUERY_EXECUTION` job carrying its id; results arrive asynchronously on
//! the query row once the executor finishes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use cohort_core::error::CoreError;
use cohort_core::job_types;
use cohort_core::types::DbId;
use cohort_db::models::job::SubmitJob;
use cohort_db::models::query::{CreateQuery, SavedQuery};
use cohort_db::models::status::JobStatus;
use cohort_db::repositories::{JobRepo, ProjectRepo, QueryRepo};
use cohort_events::JobStatusEvent;
use serde::Serialize;
use serde_json::json;

use crate::access::ensure_study_member;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Response body for query creation: the saved row plus the id of the
/// execution job, so clients can follow progress over the jobs API or the
/// WebSocket feed.
#[derive(Debug, Serialize)]
pub struct QuerySubmission {
    pub query: SavedQuery,
    pub job_id: DbId,
}

/// POST /api/v1/studies/{study_id}/queries
///
/// Save a cohort query and spawn its execution job (any member).
/// Returns 201.
pub async fn create_query(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(study_id): Path<DbId>,
    Json(input): Json<CreateQuery>,
) -> AppResult<impl IntoResponse> {
    ensure_study_member(&state.pool, &auth, study_id).await?;

    if input.name.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Query name must not be empty".into(),
        )));
    }
    if !input.query.is_object() {
        return Err(AppError::Core(CoreError::Validation(
            "query must be a JSON object".into(),
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

    let query = QueryRepo::create(&state.pool, study_id, auth.user_id, &input).await?;

    let job = JobRepo::submit(
        &state.pool,
        auth.user_id,
        study_id,
        &SubmitJob {
            job_type: job_types::QUERY_EXECUTION.to_string(),
            project_id: query.project_id,
            payload: json!({ "query_id": query.id }),
        },
    )
    .await?;

    state.event_bus.publish(JobStatusEvent::new(
        job.id,
        job.study_id,
        &job.job_type,
        JobStatus::Pending.name(),
    ));

    tracing::info!(
        study_id,
        query_id = query.id,
        job_id = job.id,
        requested_by = auth.user_id,
        "Query saved and execution job submitted",
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse { data: QuerySubmission { query, job_id: job.id } }),
    ))
}

/// GET /api/v1/studies/{study_id}/queries
pub async fn list_queries(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(study_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<SavedQuery>>>> {
    ensure_study_member(&state.pool, &auth, study_id).await?;
    let queries = QueryRepo::list_for_study(&state.pool, study_id).await?;
    Ok(Json(DataResponse { data: queries }))
}

/// GET /api/v1/studies/{study_id}/queries/{query_id}
///
/// Fetch a saved query; `result` is populated once execution completed.
pub async fn get_query(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((study_id, query_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DataResponse<SavedQuery>>> {
    ensure_study_member(&state.pool, &auth, study_id).await?;

    let query = QueryRepo::find_by_id(&state.pool, query_id)
        .await?
        .filter(|q| q.study_id == study_id)
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Query",
            id: query_id,
        }))?;

    Ok(Json(DataResponse { data: query }))
}
