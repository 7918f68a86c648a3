//! Background loop that claims pending jobs and feeds them to the
//! dispatcher.
//!
//! The loop owns every status write the dispatcher refuses to make:
//! unroutable claims become `UNPROCESSED`, dispatch failures become `ERROR`
//! with the propagated messages, and each transition is published on the
//! event bus. Success-path writes (`FINISHED` plus result) belong to the
//! handlers themselves.

use std::sync::Arc;
use std::time::Duration;

use cohort_db::models::status::JobStatus;
use cohort_db::repositories::JobRepo;
use cohort_db::DbPool;
use cohort_events::{EventBus, JobStatusEvent};
use tokio_util::sync::CancellationToken;

use crate::dispatcher::JobDispatcher;

/// Default time between claim attempts.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// PollConfig
// ---------------------------------------------------------------------------

/// Poll-loop settings, read from the environment at startup.
///
/// | Variable           | Default        | Meaning                          |
/// |--------------------|----------------|----------------------------------|
/// | `POLL_INTERVAL_MS` | `1000`         | Time between claim attempts      |
/// | `HOSTNAME`         | `executor`     | Host part of the claim identity  |
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub interval: Duration,
    /// Identity recorded on claimed rows, `{hostname}-{pid}`.
    pub claimed_by: String,
}

impl PollConfig {
    pub fn from_env() -> Self {
        let interval = std::env::var("POLL_INTERVAL_MS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_POLL_INTERVAL);
        Self { interval, claimed_by: claim_identity() }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { interval: DEFAULT_POLL_INTERVAL, claimed_by: claim_identity() }
    }
}

/// `{hostname}-{pid}`, so a stuck claim can be traced to a process.
fn claim_identity() -> String {
    let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "executor".to_string());
    format!("{host}-{}", std::process::id())
}

// ---------------------------------------------------------------------------
// CurationLoop
// ---------------------------------------------------------------------------

/// Background service that drains the job queue one claim at a time.
///
/// Any number of loop instances (in the dedicated executor process, inside
/// the API process, or both) can run against one database; `claim_next`'s
/// `FOR UPDATE SKIP LOCKED` claim keeps them from double-processing.
pub struct CurationLoop {
    pool: DbPool,
    dispatcher: Arc<JobDispatcher>,
    bus: Arc<EventBus>,
    config: PollConfig,
}

impl CurationLoop {
    pub fn new(
        pool: DbPool,
        dispatcher: Arc<JobDispatcher>,
        bus: Arc<EventBus>,
        config: PollConfig,
    ) -> Self {
        Self { pool, dispatcher, bus, config }
    }

    /// Run the claim/dispatch loop.
    ///
    /// Exits gracefully when `cancel` is triggered; an in-flight job is
    /// allowed to finish its current tick first.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        tracing::info!(
            interval_ms = self.config.interval.as_millis() as u64,
            claimed_by = %self.config.claimed_by,
            "Curation loop started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Curation loop cancelled");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        tracing::error!(error = %e, "Curation tick failed");
                    }
                }
            }
        }
    }

    /// Claim and process at most one job.
    ///
    /// Returns `Ok(true)` when a job was claimed. Dispatch failures are
    /// handled here (job marked `ERROR`); only infrastructure failures
    /// around the claim/bookkeeping writes surface as `Err`.
    pub async fn tick(&self) -> Result<bool, sqlx::Error> {
        let Some(job) = JobRepo::claim_next(&self.pool, &self.config.claimed_by).await? else {
            return Ok(false);
        };

        if !self.dispatcher.is_registered(&job.job_type) {
            tracing::warn!(
                job_id = job.id,
                job_type = %job.job_type,
                "No handler registered, marking job UNPROCESSED"
            );
            JobRepo::mark_unprocessed(&self.pool, job.id).await?;
            self.bus.publish(JobStatusEvent::new(
                job.id,
                job.study_id,
                &job.job_type,
                JobStatus::Unprocessed.name(),
            ));
            return Ok(true);
        }

        // The claim already moved the row to PROCESSING.
        JobRepo::mark_started(&self.pool, job.id).await?;
        self.bus.publish(JobStatusEvent::new(
            job.id,
            job.study_id,
            &job.job_type,
            JobStatus::Processing.name(),
        ));
        tracing::info!(job_id = job.id, job_type = %job.job_type, "Dispatching job");

        match self.dispatcher.dispatch(&job).await {
            Ok(()) => {
                // The handler wrote FINISHED and the result summary.
                tracing::info!(job_id = job.id, job_type = %job.job_type, "Job finished");
                self.bus.publish(JobStatusEvent::new(
                    job.id,
                    job.study_id,
                    &job.job_type,
                    JobStatus::Finished.name(),
                ));
            }
            Err(e) => {
                let messages = e.messages();
                tracing::error!(
                    job_id = job.id,
                    job_type = %job.job_type,
                    error = %e,
                    "Job failed"
                );
                JobRepo::fail(&self.pool, job.id, &messages).await?;
                self.bus.publish(
                    JobStatusEvent::new(
                        job.id,
                        job.study_id,
                        &job.job_type,
                        JobStatus::Error.name(),
                    )
                    .with_error(messages),
                );
            }
        }

        Ok(true)
    }
}
