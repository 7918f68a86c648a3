//! Repository for the `queries` table (saved cohort queries).

use cohort_core::types::DbId;
use sqlx::PgPool;

use crate::models::query::{CreateQuery, SavedQuery};
use crate::models::status::QueryStatus;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, study_id, project_id, name, query, requested_by, \
                        status_id, result, error, created_at, updated_at";

/// Provides CRUD operations for saved cohort queries.
pub struct QueryRepo;

impl QueryRepo {
    /// Insert a new SAVED query, returning the created row.
    pub async fn create(
        pool: &PgPool,
        study_id: DbId,
        requested_by: DbId,
        input: &CreateQuery,
    ) -> Result<SavedQuery, sqlx::Error> {
        let query = format!(
            "INSERT INTO queries (study_id, project_id, name, query, requested_by, status_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SavedQuery>(&query)
            .bind(study_id)
            .bind(input.project_id)
            .bind(&input.name)
            .bind(&input.query)
            .bind(requested_by)
            .bind(QueryStatus::Saved.id())
            .fetch_one(pool)
            .await
    }

    /// Find a query by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<SavedQuery>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM queries WHERE id = $1");
        sqlx::query_as::<_, SavedQuery>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a study's queries, most recently created first.
    pub async fn list_for_study(
        pool: &PgPool,
        study_id: DbId,
    ) -> Result<Vec<SavedQuery>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM queries WHERE study_id = $1 ORDER BY created_at DESC");
        sqlx::query_as::<_, SavedQuery>(&query)
            .bind(study_id)
            .fetch_all(pool)
            .await
    }

    /// Mark a query RUNNING while its execution job is in flight.
    pub async fn mark_running(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE queries SET status_id = $2 WHERE id = $1")
            .bind(id)
            .bind(QueryStatus::Running.id())
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Store the execution result and mark the query COMPLETED.
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        result: &serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE queries SET status_id = $2, result = $3, error = NULL WHERE id = $1")
            .bind(id)
            .bind(QueryStatus::Completed.id())
            .bind(result)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Record an execution failure and mark the query ERROR.
    pub async fn fail(pool: &PgPool, id: DbId, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE queries SET status_id = $2, error = $3 WHERE id = $1")
            .bind(id)
            .bind(QueryStatus::Error.id())
            .bind(error)
            .execute(pool)
            .await?;
        Ok(())
    }
}
