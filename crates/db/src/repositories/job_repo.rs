//! Repository for the `jobs` table.
//!
//! Uses `JobStatus` from `models::status` for all status transitions.
//! No magic numbers -- every status literal is a named constant. The
//! dispatcher itself never writes status; these transitions belong to
//! the API (submit, cancel), the poll loop (claim, unprocessed, error),
//! and the handlers (finish).

use cohort_core::types::DbId;
use sqlx::PgPool;

use crate::models::job::{Job, JobListQuery, SubmitJob};
use crate::models::status::JobStatus;

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, job_type, status_id, study_id, project_id, requested_by, \
    payload, result, error, cancelled, cancelled_at, \
    claimed_by, claimed_at, started_at, finished_at, \
    created_at, updated_at";

/// Maximum page size for job listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for job listing.
const DEFAULT_LIMIT: i64 = 50;

/// Provides CRUD operations for curation jobs.
pub struct JobRepo;

impl JobRepo {
    /// Create a new PENDING job. Returns immediately with the job row.
    pub async fn submit(
        pool: &PgPool,
        requested_by: DbId,
        study_id: DbId,
        input: &SubmitJob,
    ) -> Result<Job, sqlx::Error> {
        let query = format!(
            "INSERT INTO jobs (job_type, status_id, study_id, project_id, requested_by, payload) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(&input.job_type)
            .bind(JobStatus::Pending.id())
            .bind(study_id)
            .bind(input.project_id)
            .bind(requested_by)
            .bind(&input.payload)
            .fetch_one(pool)
            .await
    }

    /// Atomically claim the oldest unclaimed PENDING job.
    ///
    /// Uses `SELECT FOR UPDATE SKIP LOCKED` so any mix of poll-loop
    /// instances can run against one database without double-claiming.
    /// Cancelled jobs are never claimed.
    pub async fn claim_next(pool: &PgPool, claimed_by: &str) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs \
             SET claimed_by = $1, claimed_at = NOW(), status_id = $2 \
             WHERE id = ( \
                 SELECT id FROM jobs \
                 WHERE status_id = $3 AND claimed_at IS NULL AND cancelled = false \
                 ORDER BY created_at ASC, id ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(claimed_by)
            .bind(JobStatus::Processing.id())
            .bind(JobStatus::Pending.id())
            .fetch_optional(pool)
            .await
    }

    /// Set `started_at` when the handler actually begins (after the
    /// routability and cancellation checks).
    pub async fn mark_started(pool: &PgPool, job_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE jobs SET started_at = NOW() WHERE id = $1")
            .bind(job_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Mark a job FINISHED with its result summary.
    pub async fn finish(
        pool: &PgPool,
        job_id: DbId,
        result: &serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE jobs SET status_id = $2, result = $3, finished_at = NOW() WHERE id = $1",
        )
        .bind(job_id)
        .bind(JobStatus::Finished.id())
        .bind(result)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark a job ERROR with the collected error messages.
    ///
    /// No automatic retry exists; the user resubmits if appropriate.
    pub async fn fail(pool: &PgPool, job_id: DbId, errors: &[String]) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE jobs SET status_id = $2, error = $3, finished_at = NOW() WHERE id = $1",
        )
        .bind(job_id)
        .bind(JobStatus::Error.id())
        .bind(serde_json::json!(errors))
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark a job UNPROCESSED: it was claimed but no handler is registered
    /// for its `job_type`.
    pub async fn mark_unprocessed(pool: &PgPool, job_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE jobs SET status_id = $2, finished_at = NOW() WHERE id = $1")
            .bind(job_id)
            .bind(JobStatus::Unprocessed.id())
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Flag a PENDING job as cancelled so it is never claimed.
    ///
    /// Returns `false` once the job has been claimed or already cancelled;
    /// execution in progress is not interrupted.
    pub async fn cancel(pool: &PgPool, job_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs \
             SET cancelled = true, cancelled_at = NOW(), finished_at = NOW() \
             WHERE id = $1 AND status_id = $2 AND cancelled = false",
        )
        .bind(job_id)
        .bind(JobStatus::Pending.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a study's jobs with optional status filter and pagination,
    /// most recently submitted first.
    pub async fn list_for_study(
        pool: &PgPool,
        study_id: DbId,
        params: &JobListQuery,
    ) -> Result<Vec<Job>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = params.offset.unwrap_or(0);

        // Build the WHERE clause and track the next bind parameter index.
        let mut conditions = vec!["study_id = $1".to_string()];
        let mut bind_idx: u32 = 2;

        if params.status_id.is_some() {
            conditions.push(format!("status_id = ${bind_idx}"));
            bind_idx += 1;
        }

        let query = format!(
            "SELECT {COLUMNS} FROM jobs \
             WHERE {} \
             ORDER BY created_at DESC \
             LIMIT ${bind_idx} OFFSET ${}",
            conditions.join(" AND "),
            bind_idx + 1,
        );

        let mut q = sqlx::query_as::<_, Job>(&query).bind(study_id);
        if let Some(status_id) = params.status_id {
            q = q.bind(status_id);
        }

        q.bind(limit).bind(offset).fetch_all(pool).await
    }
}
