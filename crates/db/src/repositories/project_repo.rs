//! Repository for the `projects` table.

use cohort_core::types::DbId;
use sqlx::PgPool;

use crate::models::project::{CreateProject, EditApprovedFields, Project};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, study_id, name, created_by, approved_fields, \
                        deleted_at, created_at, updated_at";

/// Provides CRUD operations for projects.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Insert a new project, returning the created row.
    pub async fn create(
        pool: &PgPool,
        study_id: DbId,
        created_by: DbId,
        input: &CreateProject,
    ) -> Result<Project, sqlx::Error> {
        let query = format!(
            "INSERT INTO projects (study_id, name, created_by, approved_fields)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(study_id)
            .bind(&input.name)
            .bind(created_by)
            .bind(&input.approved_fields)
            .fetch_one(pool)
            .await
    }

    /// Find a project by its internal ID. Excludes soft-deleted rows.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a study's live projects, most recently created first.
    pub async fn list_for_study(
        pool: &PgPool,
        study_id: DbId,
    ) -> Result<Vec<Project>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM projects
             WHERE study_id = $1 AND deleted_at IS NULL
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(study_id)
            .fetch_all(pool)
            .await
    }

    /// Replace a project's approved-field list (`None` clears the
    /// restriction). Returns `None` if no live row exists.
    pub async fn set_approved_fields(
        pool: &PgPool,
        id: DbId,
        input: &EditApprovedFields,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET approved_fields = $2
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(&input.approved_fields)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a project. Returns `true` if a live row was deleted.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE projects SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
