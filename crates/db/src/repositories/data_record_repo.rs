//! Repository for the `data_records` table (curated datapoints).

use cohort_core::types::DbId;
use sqlx::PgPool;

use crate::models::data_record::{DataRecord, DataRecordFilter, DeleteDataRecords, NewDataRecord};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, study_id, data_version_id, subject_id, visit_id, field_id, \
                        value, source_file_id, created_at, updated_at";

/// Maximum page size for record listing.
const MAX_LIMIT: i64 = 10_000;

/// Default page size for record listing.
const DEFAULT_LIMIT: i64 = 1_000;

/// Provides read/write operations for curated datapoints.
pub struct DataRecordRepo;

impl DataRecordRepo {
    /// Write a batch of curated datapoints in one transaction.
    ///
    /// Within a data version, a datapoint is keyed by
    /// `(subject_id, visit_id, field_id)`; re-curation overwrites in place.
    /// Returns the number of rows written.
    pub async fn upsert_batch(
        pool: &PgPool,
        study_id: DbId,
        data_version_id: DbId,
        source_file_id: Option<DbId>,
        records: &[NewDataRecord],
    ) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let mut written = 0u64;
        for record in records {
            let result = sqlx::query(
                "INSERT INTO data_records
                     (study_id, data_version_id, subject_id, visit_id, field_id, value, source_file_id)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 ON CONFLICT (data_version_id, subject_id, visit_id, field_id)
                 DO UPDATE SET value = EXCLUDED.value, source_file_id = EXCLUDED.source_file_id",
            )
            .bind(study_id)
            .bind(data_version_id)
            .bind(&record.subject_id)
            .bind(&record.visit_id)
            .bind(record.field_id)
            .bind(&record.value)
            .bind(source_file_id)
            .execute(&mut *tx)
            .await?;
            written += result.rows_affected();
        }
        tx.commit().await?;
        Ok(written)
    }

    /// List records in one data version with optional filters and pagination.
    ///
    /// When `approved_fields` is `Some`, only records for those field ids
    /// are returned (the project mask).
    pub async fn list_for_version(
        pool: &PgPool,
        study_id: DbId,
        data_version_id: DbId,
        filter: &DataRecordFilter,
        approved_fields: Option<&[DbId]>,
    ) -> Result<Vec<DataRecord>, sqlx::Error> {
        let limit = filter.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = filter.offset.unwrap_or(0);

        // Build the WHERE clause and track the next bind parameter index.
        let mut conditions = vec![
            "study_id = $1".to_string(),
            "data_version_id = $2".to_string(),
        ];
        let mut bind_idx: u32 = 3;

        if filter.subject_id.is_some() {
            conditions.push(format!("subject_id = ${bind_idx}"));
            bind_idx += 1;
        }
        if filter.visit_id.is_some() {
            conditions.push(format!("visit_id = ${bind_idx}"));
            bind_idx += 1;
        }
        if filter.field_id.is_some() {
            conditions.push(format!("field_id = ${bind_idx}"));
            bind_idx += 1;
        }
        if approved_fields.is_some() {
            conditions.push(format!("field_id = ANY(${bind_idx})"));
            bind_idx += 1;
        }

        let query = format!(
            "SELECT {COLUMNS} FROM data_records
             WHERE {}
             ORDER BY subject_id ASC, visit_id ASC, field_id ASC
             LIMIT ${bind_idx} OFFSET ${}",
            conditions.join(" AND "),
            bind_idx + 1,
        );

        let mut q = sqlx::query_as::<_, DataRecord>(&query)
            .bind(study_id)
            .bind(data_version_id);

        if let Some(subject_id) = &filter.subject_id {
            q = q.bind(subject_id);
        }
        if let Some(visit_id) = &filter.visit_id {
            q = q.bind(visit_id);
        }
        if let Some(field_id) = filter.field_id {
            q = q.bind(field_id);
        }
        if let Some(fields) = approved_fields {
            q = q.bind(fields.to_vec());
        }

        q.bind(limit).bind(offset).fetch_all(pool).await
    }

    /// Load every record in one data version, optionally masked to a field
    /// set. Used by query execution, which aggregates in memory.
    pub async fn all_for_version(
        pool: &PgPool,
        study_id: DbId,
        data_version_id: DbId,
        approved_fields: Option<&[DbId]>,
    ) -> Result<Vec<DataRecord>, sqlx::Error> {
        match approved_fields {
            Some(fields) => {
                let query = format!(
                    "SELECT {COLUMNS} FROM data_records
                     WHERE study_id = $1 AND data_version_id = $2 AND field_id = ANY($3)
                     ORDER BY subject_id ASC, visit_id ASC, field_id ASC"
                );
                sqlx::query_as::<_, DataRecord>(&query)
                    .bind(study_id)
                    .bind(data_version_id)
                    .bind(fields.to_vec())
                    .fetch_all(pool)
                    .await
            }
            None => {
                let query = format!(
                    "SELECT {COLUMNS} FROM data_records
                     WHERE study_id = $1 AND data_version_id = $2
                     ORDER BY subject_id ASC, visit_id ASC, field_id ASC"
                );
                sqlx::query_as::<_, DataRecord>(&query)
                    .bind(study_id)
                    .bind(data_version_id)
                    .fetch_all(pool)
                    .await
            }
        }
    }

    /// Delete records within one data version, scoped by the given filters.
    ///
    /// The caller must ensure at least one of subject/visit/field is set;
    /// this method refuses an unscoped delete by returning 0.
    pub async fn delete_scoped(
        pool: &PgPool,
        study_id: DbId,
        data_version_id: DbId,
        scope: &DeleteDataRecords,
    ) -> Result<u64, sqlx::Error> {
        let mut conditions = vec![
            "study_id = $1".to_string(),
            "data_version_id = $2".to_string(),
        ];

        if scope.subject_id.is_some() {
            conditions.push(format!("subject_id = ${}", conditions.len() + 1));
        }
        if scope.visit_id.is_some() {
            conditions.push(format!("visit_id = ${}", conditions.len() + 1));
        }
        if scope.field_id.is_some() {
            conditions.push(format!("field_id = ${}", conditions.len() + 1));
        }

        // Exactly the two version conditions means no scope was supplied.
        if conditions.len() == 2 {
            return Ok(0);
        }

        let query = format!("DELETE FROM data_records WHERE {}", conditions.join(" AND "));

        let mut q = sqlx::query(&query).bind(study_id).bind(data_version_id);
        if let Some(subject_id) = &scope.subject_id {
            q = q.bind(subject_id);
        }
        if let Some(visit_id) = &scope.visit_id {
            q = q.bind(visit_id);
        }
        if let Some(field_id) = scope.field_id {
            q = q.bind(field_id);
        }

        let result = q.execute(pool).await?;
        Ok(result.rows_affected())
    }
}
