//! Repository for the `studies` and `study_data_versions` tables.

use cohort_core::types::DbId;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::status::StudyType;
use crate::models::study::{CreateDataVersion, CreateStudy, Study, StudyDataVersion, UpdateStudy};

/// Column list for `studies` queries.
const COLUMNS: &str = "id, name, description, study_type_id, created_by, \
                        current_data_version_id, deleted_at, created_at, updated_at";

/// Column list for `study_data_versions` queries.
const VERSION_COLUMNS: &str = "id, study_id, version, tag, content_id, created_at, updated_at";

/// Provides CRUD operations for studies and their data versions.
pub struct StudyRepo;

impl StudyRepo {
    /// Insert a new study, returning the created row.
    ///
    /// If `study_type_id` is `None` in the input, defaults to ANY.
    pub async fn create(
        pool: &PgPool,
        created_by: DbId,
        input: &CreateStudy,
    ) -> Result<Study, sqlx::Error> {
        let query = format!(
            "INSERT INTO studies (name, description, study_type_id, created_by)
             VALUES ($1, $2, COALESCE($3, $4), $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Study>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.study_type_id)
            .bind(StudyType::Any.id())
            .bind(created_by)
            .fetch_one(pool)
            .await
    }

    /// Find a study by its internal ID. Excludes soft-deleted rows.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Study>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM studies WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Study>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a live study by name.
    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Study>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM studies WHERE name = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Study>(&query)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    /// List all live studies, most recently created first (admin view).
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Study>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM studies WHERE deleted_at IS NULL ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Study>(&query).fetch_all(pool).await
    }

    /// List live studies the given user is a member of.
    pub async fn list_for_user(pool: &PgPool, user_id: DbId) -> Result<Vec<Study>, sqlx::Error> {
        let query = format!(
            "SELECT s.{} FROM studies s
             JOIN study_members m ON m.study_id = s.id
             WHERE m.user_id = $1 AND s.deleted_at IS NULL
             ORDER BY s.created_at DESC",
            COLUMNS.replace(", ", ", s."),
        );
        sqlx::query_as::<_, Study>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Update a study. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no live row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateStudy,
    ) -> Result<Option<Study>, sqlx::Error> {
        let query = format!(
            "UPDATE studies SET description = COALESCE($2, description)
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Study>(&query)
            .bind(id)
            .bind(&input.description)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a study. Returns `true` if a live row was deleted.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE studies SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Data versions
    // -----------------------------------------------------------------------

    /// Create a new data version for a study with a fresh content id.
    pub async fn create_data_version(
        pool: &PgPool,
        study_id: DbId,
        input: &CreateDataVersion,
    ) -> Result<StudyDataVersion, sqlx::Error> {
        let query = format!(
            "INSERT INTO study_data_versions (study_id, version, tag, content_id)
             VALUES ($1, $2, $3, $4)
             RETURNING {VERSION_COLUMNS}"
        );
        sqlx::query_as::<_, StudyDataVersion>(&query)
            .bind(study_id)
            .bind(&input.version)
            .bind(&input.tag)
            .bind(Uuid::new_v4())
            .fetch_one(pool)
            .await
    }

    /// List data versions for a study, oldest first.
    pub async fn list_data_versions(
        pool: &PgPool,
        study_id: DbId,
    ) -> Result<Vec<StudyDataVersion>, sqlx::Error> {
        let query = format!(
            "SELECT {VERSION_COLUMNS} FROM study_data_versions
             WHERE study_id = $1 ORDER BY id ASC"
        );
        sqlx::query_as::<_, StudyDataVersion>(&query)
            .bind(study_id)
            .fetch_all(pool)
            .await
    }

    /// Find a data version by ID, scoped to a study.
    pub async fn find_data_version(
        pool: &PgPool,
        study_id: DbId,
        version_id: DbId,
    ) -> Result<Option<StudyDataVersion>, sqlx::Error> {
        let query = format!(
            "SELECT {VERSION_COLUMNS} FROM study_data_versions
             WHERE id = $1 AND study_id = $2"
        );
        sqlx::query_as::<_, StudyDataVersion>(&query)
            .bind(version_id)
            .bind(study_id)
            .fetch_optional(pool)
            .await
    }

    /// Point a study at one of its data versions.
    ///
    /// Returns `false` when the study is missing or the version does not
    /// belong to it.
    pub async fn set_current_data_version(
        pool: &PgPool,
        study_id: DbId,
        version_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE studies SET current_data_version_id = $2
             WHERE id = $1 AND deleted_at IS NULL
               AND EXISTS (
                   SELECT 1 FROM study_data_versions
                   WHERE id = $2 AND study_id = $1
               )",
        )
        .bind(study_id)
        .bind(version_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
