//! Handlers for the `/studies/{study_id}/fields` resource.
//!
//! The field dictionary is the contract every CSV upload is validated
//! against, so writes are manager-only and the data type is checked
//! against the known set on the way in.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use cohort_core::error::CoreError;
use cohort_core::types::DbId;
use cohort_db::models::field::{CreateField, Field, UpdateField};
use cohort_db::models::status::FieldDataType;
use cohort_db::repositories::FieldRepo;
use cohort_db::DbPool;

use crate::access::{ensure_study_manager, ensure_study_member};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_in_study(pool: &DbPool, study_id: DbId, field_id: DbId) -> AppResult<Field> {
    let field = FieldRepo::find_by_id(pool, field_id)
        .await?
        .filter(|f| f.study_id == study_id)
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Field",
            id: field_id,
        }))?;
    Ok(field)
}

/// Shared validation for create and update writes.
///
/// Categorical fields must carry a `possible_values` object; the check is
/// skipped on updates that touch neither the type nor the values.
fn validate_field_shape(
    data_type_id: i16,
    possible_values: Option<&serde_json::Value>,
) -> AppResult<()> {
    let Some(data_type) = FieldDataType::from_id(data_type_id) else {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Unknown data type id {data_type_id}"
        ))));
    };

    if data_type == FieldDataType::Categorical {
        match possible_values {
            Some(serde_json::Value::Object(map)) if !map.is_empty() => {}
            _ => {
                return Err(AppError::Core(CoreError::Validation(
                    "Categorical fields require a non-empty possible_values object".into(),
                )));
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/studies/{study_id}/fields
pub async fn list_fields(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(study_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Field>>>> {
    ensure_study_member(&state.pool, &auth, study_id).await?;
    let fields = FieldRepo::list_for_study(&state.pool, study_id).await?;
    Ok(Json(DataResponse { data: fields }))
}

/// POST /api/v1/studies/{study_id}/fields
///
/// Create a field-dictionary entry (manager or admin). The field code must
/// be unique among the study's live fields. Returns 201.
pub async fn create_field(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(study_id): Path<DbId>,
    Json(input): Json<CreateField>,
) -> AppResult<impl IntoResponse> {
    ensure_study_manager(&state.pool, &auth, study_id).await?;

    if input.field_code.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Field code must not be empty".into(),
        )));
    }
    validate_field_shape(input.data_type_id, input.possible_values.as_ref())?;

    if FieldRepo::find_by_code(&state.pool, study_id, &input.field_code).await?.is_some() {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Field code `{}` already in use",
            input.field_code
        ))));
    }

    let field = FieldRepo::create(&state.pool, study_id, &input).await?;

    tracing::info!(
        study_id,
        field_id = field.id,
        field_code = %field.field_code,
        created_by = auth.user_id,
        "Field created",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: field })))
}

/// PUT /api/v1/studies/{study_id}/fields/{field_id}
///
/// Update a field-dictionary entry (manager or admin). The field code is
/// immutable; recreate the field to change it.
pub async fn update_field(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((study_id, field_id)): Path<(DbId, DbId)>,
    Json(input): Json<UpdateField>,
) -> AppResult<Json<DataResponse<Field>>> {
    ensure_study_manager(&state.pool, &auth, study_id).await?;
    let existing = find_in_study(&state.pool, study_id, field_id).await?;

    // Validate against the post-update shape, not just the patch.
    let data_type_id = input.data_type_id.unwrap_or(existing.data_type_id);
    let possible_values = input.possible_values.as_ref().or(existing.possible_values.as_ref());
    validate_field_shape(data_type_id, possible_values)?;

    let field = FieldRepo::update(&state.pool, field_id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Field",
            id: field_id,
        }))?;

    tracing::info!(study_id, field_id, updated_by = auth.user_id, "Field updated");
    Ok(Json(DataResponse { data: field }))
}

/// DELETE /api/v1/studies/{study_id}/fields/{field_id}
///
/// Soft-delete a field (manager or admin). Curated records keep their
/// field references; the code becomes reusable. Returns 204.
pub async fn delete_field(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((study_id, field_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    ensure_study_manager(&state.pool, &auth, study_id).await?;
    find_in_study(&state.pool, study_id, field_id).await?;

    let deleted = FieldRepo::soft_delete(&state.pool, field_id).await?;
    if !deleted {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Field",
            id: field_id,
        }));
    }

    tracing::info!(study_id, field_id, deleted_by = auth.user_id, "Field deleted");
    Ok(StatusCode::NO_CONTENT)
}
