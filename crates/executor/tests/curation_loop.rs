//! Integration tests for the claim/dispatch poll loop.
//!
//! Covers the bookkeeping the loop owns around the dispatcher: claiming,
//! UNPROCESSED for unroutable types, ERROR with propagated messages, and
//! never claiming cancelled jobs. Handlers here are minimal test doubles;
//! the stock handlers have their own tests.

use std::sync::Arc;
use std::time::Duration;

use cohort_db::models::job::{Job, SubmitJob};
use cohort_db::models::status::JobStatus;
use cohort_db::models::study::CreateStudy;
use cohort_db::models::user::{CreateUser, User};
use cohort_db::repositories::{JobRepo, RoleRepo, StudyRepo, UserRepo};
use cohort_events::EventBus;
use cohort_executor::{
    BoxedHandler, CurationLoop, ExecutorError, HandlerRegistry, JobDispatcher, JobHandler,
    PollConfig,
};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_user(pool: &PgPool, username: &str) -> User {
    let role = RoleRepo::find_by_name(pool, "standard")
        .await
        .unwrap()
        .expect("standard role is seeded");
    UserRepo::create(
        pool,
        &CreateUser {
            username: username.to_string(),
            email: format!("{username}@example.org"),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHQ$dGVzdGhhc2g".to_string(),
            role_id: role.id,
            organisation: None,
            description: None,
        },
    )
    .await
    .unwrap()
}

async fn seed_study(pool: &PgPool, user: &User, name: &str) -> i64 {
    StudyRepo::create(
        pool,
        user.id,
        &CreateStudy { name: name.to_string(), description: None, study_type_id: None },
    )
    .await
    .unwrap()
    .id
}

async fn submit_job(pool: &PgPool, user: &User, study_id: i64, job_type: &str) -> Job {
    JobRepo::submit(
        pool,
        user.id,
        study_id,
        &SubmitJob {
            job_type: job_type.to_string(),
            project_id: None,
            payload: serde_json::json!({}),
        },
    )
    .await
    .unwrap()
}

fn build_loop(pool: &PgPool, dispatcher: JobDispatcher) -> (CurationLoop, Arc<EventBus>) {
    let bus = Arc::new(EventBus::default());
    let config = PollConfig {
        interval: Duration::from_millis(10),
        claimed_by: "test-loop-1".to_string(),
    };
    let curation_loop =
        CurationLoop::new(pool.clone(), Arc::new(dispatcher), bus.clone(), config);
    (curation_loop, bus)
}

/// Writes the FINISHED result itself, like the stock handlers do.
struct FinishingHandler {
    pool: PgPool,
}

#[async_trait::async_trait]
impl JobHandler for FinishingHandler {
    async fn execute(&self, job: &Job) -> Result<(), ExecutorError> {
        JobRepo::finish(&self.pool, job.id, &serde_json::json!({ "ok": true })).await?;
        Ok(())
    }
}

struct BoomHandler;

#[async_trait::async_trait]
impl JobHandler for BoomHandler {
    async fn execute(&self, _job: &Job) -> Result<(), ExecutorError> {
        Err(ExecutorError::Invalid(vec!["boom".to_string()]))
    }
}

fn finishing_dispatcher(pool: &PgPool, job_type: &str) -> JobDispatcher {
    let mut dispatcher = JobDispatcher::new(HandlerRegistry::new());
    let pool = pool.clone();
    dispatcher.register(job_type, move || {
        let handler = FinishingHandler { pool: pool.clone() };
        async move { Ok(Box::new(handler) as BoxedHandler) }
    });
    dispatcher
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_tick_with_empty_queue_claims_nothing(pool: PgPool) {
    let (curation_loop, _bus) = build_loop(&pool, JobDispatcher::new(HandlerRegistry::new()));
    assert!(!curation_loop.tick().await.unwrap());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_successful_job_transitions_to_finished(pool: PgPool) {
    let user = seed_user(&pool, "runner").await;
    let study_id = seed_study(&pool, &user, "Loop study").await;
    let job = submit_job(&pool, &user, study_id, "TEST_OK").await;

    let (curation_loop, bus) = build_loop(&pool, finishing_dispatcher(&pool, "TEST_OK"));
    let mut events = bus.subscribe();

    assert!(curation_loop.tick().await.unwrap());

    let row = JobRepo::find_by_id(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(row.status_id, JobStatus::Finished.id());
    assert_eq!(row.claimed_by.as_deref(), Some("test-loop-1"));
    assert!(row.claimed_at.is_some());
    assert!(row.started_at.is_some());
    assert!(row.finished_at.is_some());
    assert_eq!(row.result, Some(serde_json::json!({ "ok": true })));

    let processing = events.recv().await.unwrap();
    assert_eq!(processing.status, "PROCESSING");
    assert_eq!(processing.job_id, job.id);
    assert_eq!(processing.study_id, study_id);

    let finished = events.recv().await.unwrap();
    assert_eq!(finished.status, "FINISHED");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_unroutable_job_marked_unprocessed(pool: PgPool) {
    let user = seed_user(&pool, "runner").await;
    let study_id = seed_study(&pool, &user, "Loop study").await;
    let job = submit_job(&pool, &user, study_id, "NOBODY_HOME").await;

    let (curation_loop, bus) = build_loop(&pool, JobDispatcher::new(HandlerRegistry::new()));
    let mut events = bus.subscribe();

    assert!(curation_loop.tick().await.unwrap());

    let row = JobRepo::find_by_id(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(row.status_id, JobStatus::Unprocessed.id());
    assert!(row.finished_at.is_some());
    // The handler never ran.
    assert!(row.started_at.is_none());
    assert!(row.result.is_none());

    let event = events.recv().await.unwrap();
    assert_eq!(event.status, "UNPROCESSED");
    assert_eq!(event.job_type, "NOBODY_HOME");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_failing_job_marked_error_with_messages(pool: PgPool) {
    let user = seed_user(&pool, "runner").await;
    let study_id = seed_study(&pool, &user, "Loop study").await;
    let job = submit_job(&pool, &user, study_id, "TEST_BOOM").await;

    let mut dispatcher = JobDispatcher::new(HandlerRegistry::new());
    dispatcher.register("TEST_BOOM", || async { Ok(Box::new(BoomHandler) as BoxedHandler) });
    let (curation_loop, bus) = build_loop(&pool, dispatcher);
    let mut events = bus.subscribe();

    assert!(curation_loop.tick().await.unwrap());

    let row = JobRepo::find_by_id(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(row.status_id, JobStatus::Error.id());
    assert_eq!(row.error, Some(serde_json::json!(["boom"])));
    assert!(row.finished_at.is_some());

    let processing = events.recv().await.unwrap();
    assert_eq!(processing.status, "PROCESSING");
    let errored = events.recv().await.unwrap();
    assert_eq!(errored.status, "ERROR");
    assert_eq!(errored.error, ["boom"]);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_cancelled_job_is_never_claimed(pool: PgPool) {
    let user = seed_user(&pool, "runner").await;
    let study_id = seed_study(&pool, &user, "Loop study").await;
    let job = submit_job(&pool, &user, study_id, "TEST_OK").await;

    assert!(JobRepo::cancel(&pool, job.id).await.unwrap());

    let (curation_loop, _bus) = build_loop(&pool, finishing_dispatcher(&pool, "TEST_OK"));
    assert!(!curation_loop.tick().await.unwrap());

    let row = JobRepo::find_by_id(&pool, job.id).await.unwrap().unwrap();
    assert!(row.cancelled);
    assert_eq!(row.status_id, JobStatus::Pending.id());
    assert!(row.claimed_at.is_none());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_one_claim_per_tick_in_submission_order(pool: PgPool) {
    let user = seed_user(&pool, "runner").await;
    let study_id = seed_study(&pool, &user, "Loop study").await;
    let first = submit_job(&pool, &user, study_id, "TEST_OK").await;
    let second = submit_job(&pool, &user, study_id, "TEST_OK").await;

    let (curation_loop, _bus) = build_loop(&pool, finishing_dispatcher(&pool, "TEST_OK"));

    assert!(curation_loop.tick().await.unwrap());
    let first_row = JobRepo::find_by_id(&pool, first.id).await.unwrap().unwrap();
    let second_row = JobRepo::find_by_id(&pool, second.id).await.unwrap().unwrap();
    assert_eq!(first_row.status_id, JobStatus::Finished.id());
    assert_eq!(second_row.status_id, JobStatus::Pending.id());

    assert!(curation_loop.tick().await.unwrap());
    let second_row = JobRepo::find_by_id(&pool, second.id).await.unwrap().unwrap();
    assert_eq!(second_row.status_id, JobStatus::Finished.id());

    assert!(!curation_loop.tick().await.unwrap());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_run_drains_queue_and_exits_on_cancel(pool: PgPool) {
    let user = seed_user(&pool, "runner").await;
    let study_id = seed_study(&pool, &user, "Loop study").await;
    let job = submit_job(&pool, &user, study_id, "TEST_OK").await;

    let (curation_loop, _bus) = build_loop(&pool, finishing_dispatcher(&pool, "TEST_OK"));
    let cancel = CancellationToken::new();

    let runner = {
        let cancel = cancel.clone();
        tokio::spawn(async move { curation_loop.run(cancel).await })
    };

    // Give the loop a few ticks to pick the job up.
    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), runner)
        .await
        .expect("loop should exit after cancellation")
        .unwrap();

    let row = JobRepo::find_by_id(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(row.status_id, JobStatus::Finished.id());
}
