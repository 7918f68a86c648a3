//! Repository for the `fields` table (the study field dictionary).

use cohort_core::types::DbId;
use sqlx::PgPool;

use crate::models::field::{CreateField, Field, UpdateField};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, study_id, field_code, field_name, data_type_id, unit, \
                        possible_values, comments, deleted_at, created_at, updated_at";

/// Provides CRUD operations for field-dictionary entries.
pub struct FieldRepo;

impl FieldRepo {
    /// Insert a new field, returning the created row.
    pub async fn create(
        pool: &PgPool,
        study_id: DbId,
        input: &CreateField,
    ) -> Result<Field, sqlx::Error> {
        let query = format!(
            "INSERT INTO fields
                 (study_id, field_code, field_name, data_type_id, unit, possible_values, comments)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Field>(&query)
            .bind(study_id)
            .bind(&input.field_code)
            .bind(&input.field_name)
            .bind(input.data_type_id)
            .bind(&input.unit)
            .bind(&input.possible_values)
            .bind(&input.comments)
            .fetch_one(pool)
            .await
    }

    /// Find a field by its internal ID. Excludes soft-deleted rows.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Field>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM fields WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Field>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a live field by its external code within a study.
    pub async fn find_by_code(
        pool: &PgPool,
        study_id: DbId,
        field_code: &str,
    ) -> Result<Option<Field>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM fields
             WHERE study_id = $1 AND field_code = $2 AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, Field>(&query)
            .bind(study_id)
            .bind(field_code)
            .fetch_optional(pool)
            .await
    }

    /// List a study's live fields ordered by code.
    pub async fn list_for_study(pool: &PgPool, study_id: DbId) -> Result<Vec<Field>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM fields
             WHERE study_id = $1 AND deleted_at IS NULL
             ORDER BY field_code ASC"
        );
        sqlx::query_as::<_, Field>(&query)
            .bind(study_id)
            .fetch_all(pool)
            .await
    }

    /// Update a field. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no live row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateField,
    ) -> Result<Option<Field>, sqlx::Error> {
        let query = format!(
            "UPDATE fields SET
                field_name = COALESCE($2, field_name),
                data_type_id = COALESCE($3, data_type_id),
                unit = COALESCE($4, unit),
                possible_values = COALESCE($5, possible_values),
                comments = COALESCE($6, comments)
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Field>(&query)
            .bind(id)
            .bind(&input.field_name)
            .bind(input.data_type_id)
            .bind(&input.unit)
            .bind(&input.possible_values)
            .bind(&input.comments)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a field. Returns `true` if a live row was deleted.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE fields SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
