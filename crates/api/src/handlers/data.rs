//! Handlers for the `/studies/{study_id}/data` resource.
//!
//! Reads and deletes always resolve to one concrete data version: the
//! caller's pinned `data_version_id` or the study's current pointer. A
//! study with no current version has no readable data yet.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use cohort_core::error::CoreError;
use cohort_core::types::DbId;
use cohort_db::models::data_record::{DataRecord, DataRecordFilter, DeleteDataRecords};
use cohort_db::models::study::Study;
use cohort_db::repositories::{DataRecordRepo, StudyRepo};
use cohort_db::DbPool;
use serde::Serialize;

use crate::access::{ensure_study_manager, ensure_study_member};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Resolve the version a read/delete applies to.
///
/// A pinned id must exist within the study; otherwise the study's current
/// pointer is used, and its absence is a validation error rather than an
/// empty result so callers can tell "no data yet" from "wrong filter".
async fn resolve_version(
    pool: &DbPool,
    study: &Study,
    pinned: Option<DbId>,
) -> AppResult<DbId> {
    if let Some(version_id) = pinned {
        let version = StudyRepo::find_data_version(pool, study.id, version_id).await?;
        if version.is_none() {
            return Err(AppError::Core(CoreError::NotFound {
                entity: "Data version",
                id: version_id,
            }));
        }
        return Ok(version_id);
    }

    study.current_data_version_id.ok_or(AppError::Core(CoreError::Validation(
        "Study has no current data version".into(),
    )))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Response body for data reads; echoes the resolved version so clients
/// can pin follow-up pages to it.
#[derive(Debug, Serialize)]
pub struct DataRecordsPage {
    pub data_version_id: DbId,
    pub records: Vec<DataRecord>,
}

/// GET /api/v1/studies/{study_id}/data
///
/// List curated records with optional subject/visit/field filters and
/// version pinning.
pub async fn list_records(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(study_id): Path<DbId>,
    Query(filter): Query<DataRecordFilter>,
) -> AppResult<Json<DataResponse<DataRecordsPage>>> {
    let study = ensure_study_member(&state.pool, &auth, study_id).await?;
    let version_id = resolve_version(&state.pool, &study, filter.data_version_id).await?;

    let records =
        DataRecordRepo::list_for_version(&state.pool, study_id, version_id, &filter, None).await?;

    Ok(Json(DataResponse {
        data: DataRecordsPage { data_version_id: version_id, records },
    }))
}

/// Summary returned by a scoped delete.
#[derive(Debug, Serialize)]
pub struct DeleteResult {
    pub data_version_id: DbId,
    pub deleted: u64,
}

/// DELETE /api/v1/studies/{study_id}/data
///
/// Delete curated records within one version (manager or admin). At least
/// one of subject/visit/field must be given; an unscoped delete is
/// rejected rather than interpreted as "everything".
pub async fn delete_records(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(study_id): Path<DbId>,
    Json(input): Json<DeleteDataRecords>,
) -> AppResult<Json<DataResponse<DeleteResult>>> {
    let study = ensure_study_manager(&state.pool, &auth, study_id).await?;

    if input.subject_id.is_none() && input.visit_id.is_none() && input.field_id.is_none() {
        return Err(AppError::Core(CoreError::Validation(
            "Delete requires at least one of subject_id, visit_id, field_id".into(),
        )));
    }

    let version_id = resolve_version(&state.pool, &study, input.data_version_id).await?;
    let deleted = DataRecordRepo::delete_scoped(&state.pool, study_id, version_id, &input).await?;

    tracing::info!(
        study_id,
        data_version_id = version_id,
        deleted,
        deleted_by = auth.user_id,
        "Data records deleted",
    );

    Ok(Json(DataResponse {
        data: DeleteResult { data_version_id: version_id, deleted },
    }))
}
