//! Repository for the `files` table (uploaded blob metadata).

use cohort_core::types::DbId;
use sqlx::PgPool;

use crate::models::file::{CreateStudyFile, StudyFile};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, study_id, file_name, description, file_size, content_hash, \
                        uri, uploaded_by, deleted_at, created_at, updated_at";

/// Provides CRUD operations for uploaded-file metadata.
pub struct FileRepo;

impl FileRepo {
    /// Record a completed upload, returning the created row.
    pub async fn create(
        pool: &PgPool,
        study_id: DbId,
        uploaded_by: DbId,
        input: &CreateStudyFile,
    ) -> Result<StudyFile, sqlx::Error> {
        let query = format!(
            "INSERT INTO files
                 (study_id, file_name, description, file_size, content_hash, uri, uploaded_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, StudyFile>(&query)
            .bind(study_id)
            .bind(&input.file_name)
            .bind(&input.description)
            .bind(input.file_size)
            .bind(&input.content_hash)
            .bind(&input.uri)
            .bind(uploaded_by)
            .fetch_one(pool)
            .await
    }

    /// Find a file by its internal ID. Excludes soft-deleted rows.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<StudyFile>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM files WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, StudyFile>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a study's live files, most recently uploaded first.
    pub async fn list_for_study(
        pool: &PgPool,
        study_id: DbId,
    ) -> Result<Vec<StudyFile>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM files
             WHERE study_id = $1 AND deleted_at IS NULL
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, StudyFile>(&query)
            .bind(study_id)
            .fetch_all(pool)
            .await
    }

    /// Soft-delete a file's metadata row. Returns `true` if a live row was
    /// deleted. The stored bytes are left in the file store.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE files SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
