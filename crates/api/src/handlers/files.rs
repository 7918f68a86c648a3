//! Handlers for the `/studies/{study_id}/files` resource.
//!
//! Uploads land in the blob store under an opaque `{study_id}/{uuid}` key;
//! the database row carries the display name, size, and SHA-256 so
//! curation jobs can reference files by id. Device-export names
//! (`IABCDEF-AX6ABC123-YYYYMMDD-YYYYMMDD.ext`) are parsed into metadata;
//! other names upload fine without it.

use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use cohort_core::error::CoreError;
use cohort_core::naming::{self, NamingError, FILE_SIZE_LIMIT};
use cohort_core::types::DbId;
use cohort_db::models::file::{CreateStudyFile, StudyFile};
use cohort_db::repositories::FileRepo;
use cohort_db::DbPool;
use sha2::{Digest, Sha256};
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::access::{ensure_study_manager, ensure_study_member};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_in_study(pool: &DbPool, study_id: DbId, file_id: DbId) -> AppResult<StudyFile> {
    let file = FileRepo::find_by_id(pool, file_id)
        .await?
        .filter(|f| f.study_id == study_id)
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "File",
            id: file_id,
        }))?;
    Ok(file)
}

/// Build the description JSON for an upload.
///
/// Device-export names contribute parsed metadata; a name that matches the
/// device pattern but carries an unknown site/device or a bad date range is
/// rejected outright, since it is a malformed export rather than an
/// ordinary document.
fn build_description(
    file_name: &str,
    note: Option<String>,
) -> AppResult<Option<serde_json::Value>> {
    let mut map = serde_json::Map::new();

    if let Some(note) = note {
        if !note.trim().is_empty() {
            map.insert("note".into(), serde_json::Value::String(note));
        }
    }

    match naming::parse_device_file_name(file_name) {
        Ok(meta) => {
            let site = meta
                .participant_id
                .get(..1)
                .and_then(naming::site_name)
                .unwrap_or("unknown");
            let device = meta
                .device_id
                .get(..3)
                .and_then(naming::device_name)
                .unwrap_or("unknown");
            map.insert("participant_id".into(), meta.participant_id.clone().into());
            map.insert("device_id".into(), meta.device_id.clone().into());
            map.insert("site".into(), site.into());
            map.insert("device".into(), device.into());
            map.insert("start_date".into(), meta.start_date.to_string().into());
            map.insert("end_date".into(), meta.end_date.to_string().into());
        }
        // Not a device export; upload proceeds without device metadata.
        Err(NamingError::Pattern) => {}
        Err(e) => {
            return Err(AppError::Core(CoreError::Validation(format!(
                "Invalid device file name: {e}"
            ))));
        }
    }

    if map.is_empty() {
        Ok(None)
    } else {
        Ok(Some(serde_json::Value::Object(map)))
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/studies/{study_id}/files
///
/// Multipart upload (any member). Parts: `file` (required) and an optional
/// `description` text note. Returns 201 with the metadata row.
pub async fn upload_file(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(study_id): Path<DbId>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    ensure_study_member(&state.pool, &auth, study_id).await?;

    let mut file_name: Option<String> = None;
    let mut bytes: Option<Vec<u8>> = None;
    let mut note: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        match field.name() {
            Some("file") => {
                file_name = field.file_name().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                bytes = Some(data.to_vec());
            }
            Some("description") => {
                note = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?,
                );
            }
            // Unknown parts are ignored so clients can evolve.
            _ => {}
        }
    }

    let bytes = bytes.ok_or_else(|| {
        AppError::BadRequest("Multipart upload must contain a `file` part".to_string())
    })?;
    let file_name = file_name.filter(|n| !n.trim().is_empty()).ok_or_else(|| {
        AppError::BadRequest("Uploaded file must have a filename".to_string())
    })?;

    if bytes.is_empty() {
        return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
    }
    if bytes.len() as u64 > FILE_SIZE_LIMIT {
        return Err(AppError::Core(CoreError::Validation(format!(
            "File exceeds the {FILE_SIZE_LIMIT}-byte size limit"
        ))));
    }

    let description = build_description(&file_name, note)?;

    let content_hash = format!("{:x}", Sha256::digest(&bytes));
    let file_size = bytes.len() as i64;
    let uri = format!("{study_id}/{}", Uuid::new_v4());

    state.file_store.put(&uri, bytes).await?;

    let file = FileRepo::create(
        &state.pool,
        study_id,
        auth.user_id,
        &CreateStudyFile {
            file_name,
            description,
            file_size,
            content_hash,
            uri,
        },
    )
    .await?;

    tracing::info!(
        study_id,
        file_id = file.id,
        file_name = %file.file_name,
        file_size = file.file_size,
        uploaded_by = auth.user_id,
        "File uploaded",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: file })))
}

/// GET /api/v1/studies/{study_id}/files
pub async fn list_files(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(study_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<StudyFile>>>> {
    ensure_study_member(&state.pool, &auth, study_id).await?;
    let files = FileRepo::list_for_study(&state.pool, study_id).await?;
    Ok(Json(DataResponse { data: files }))
}

/// GET /api/v1/studies/{study_id}/files/{file_id}
pub async fn get_file(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((study_id, file_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DataResponse<StudyFile>>> {
    ensure_study_member(&state.pool, &auth, study_id).await?;
    let file = find_in_study(&state.pool, study_id, file_id).await?;
    Ok(Json(DataResponse { data: file }))
}

/// GET /api/v1/studies/{study_id}/files/{file_id}/download
///
/// Stream the stored bytes as an attachment.
pub async fn download_file(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((study_id, file_id)): Path<(DbId, DbId)>,
) -> AppResult<Response> {
    ensure_study_member(&state.pool, &auth, study_id).await?;
    let file = find_in_study(&state.pool, study_id, file_id).await?;

    let reader = state.file_store.get(&file.uri).await?;
    let stream = ReaderStream::new(reader);

    // Display names are caller-supplied; quotes would break the header.
    let safe_name = file.file_name.replace(['"', '\r', '\n'], "_");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, file.file_size.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{safe_name}\""),
        )
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::InternalError(format!("Failed to build response: {e}")))
}

/// DELETE /api/v1/studies/{study_id}/files/{file_id}
///
/// Soft-delete the metadata row (manager or admin). The stored bytes stay
/// in place so finished curation jobs remain auditable. Returns 204.
pub async fn delete_file(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((study_id, file_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    ensure_study_manager(&state.pool, &auth, study_id).await?;
    find_in_study(&state.pool, study_id, file_id).await?;

    let deleted = FileRepo::soft_delete(&state.pool, file_id).await?;
    if !deleted {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "File",
            id: file_id,
        }));
    }

    tracing::info!(study_id, file_id, deleted_by = auth.user_id, "File deleted");
    Ok(StatusCode::NO_CONTENT)
}
