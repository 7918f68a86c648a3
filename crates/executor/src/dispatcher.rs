//! Routes a single job record to its handler and awaits completion.

use std::future::Future;

use cohort_db::models::job::Job;

use crate::error::ExecutorError;
use crate::handler::BoxedHandler;
use crate::registry::HandlerRegistry;

/// Stateless router over a [`HandlerRegistry`].
///
/// The dispatcher owns no per-job state and performs no status writes. It
/// reads exactly one field of the job record (`job_type`), constructs one
/// handler, and awaits one `execute`. Everything else lives with the poll
/// loop and the handlers.
///
/// `dispatch` takes `&self`, so concurrent calls from several claimed jobs
/// are fully independent; there is no mutual exclusion, per-type
/// serialization, retry, timeout, or concurrency cap at this layer.
pub struct JobDispatcher {
    registry: HandlerRegistry,
}

impl JobDispatcher {
    /// Wrap a registry assembled at startup.
    pub fn new(registry: HandlerRegistry) -> Self {
        Self { registry }
    }

    /// Register a factory for `job_type`, replacing any previous one.
    pub fn register<F, Fut>(&mut self, job_type: impl Into<String>, factory: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<BoxedHandler, ExecutorError>> + Send + 'static,
    {
        self.registry.register(job_type, factory);
    }

    /// Remove the factory for `job_type`, if any.
    pub fn unregister(&mut self, job_type: &str) {
        self.registry.unregister(job_type);
    }

    /// Whether a handler is registered for `job_type`. The poll loop uses
    /// this to mark unroutable claims `UNPROCESSED`.
    pub fn is_registered(&self, job_type: &str) -> bool {
        self.registry.contains(job_type)
    }

    /// Dispatch one job record.
    ///
    /// An unknown `job_type` resolves to `Ok(())` without constructing or
    /// invoking anything and without touching job status: the caller owns
    /// that bookkeeping. For a known type the factory runs once, the fresh
    /// handler's `execute(job)` runs once, and its result is returned
    /// verbatim; factory and execute failures both propagate unmodified.
    pub async fn dispatch(&self, job: &Job) -> Result<(), ExecutorError> {
        let Some(pending) = self.registry.instantiate(&job.job_type) else {
            return Ok(());
        };
        let handler = pending.await?;
        handler.execute(job).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use chrono::Utc;
    use cohort_db::models::status::JobStatus;
    use tokio::sync::Barrier;

    use super::*;
    use crate::handler::JobHandler;

    fn job(job_type: &str) -> Job {
        let now = Utc::now();
        Job {
            id: 1,
            job_type: job_type.to_string(),
            status_id: JobStatus::Pending.id(),
            study_id: 1,
            project_id: None,
            requested_by: 1,
            payload: serde_json::json!({}),
            result: None,
            error: None,
            cancelled: false,
            cancelled_at: None,
            claimed_by: None,
            claimed_at: None,
            started_at: None,
            finished_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Counts `execute` calls and remembers which job id it saw.
    struct CountingHandler {
        executions: Arc<AtomicUsize>,
        seen_job_id: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl JobHandler for CountingHandler {
        async fn execute(&self, job: &Job) -> Result<(), ExecutorError> {
            self.executions.fetch_add(1, Ordering::SeqCst);
            self.seen_job_id.store(job.id as usize, Ordering::SeqCst);
            Ok(())
        }
    }

    fn counting_dispatcher(
        job_type: &str,
        instances: Arc<AtomicUsize>,
        executions: Arc<AtomicUsize>,
        seen_job_id: Arc<AtomicUsize>,
    ) -> JobDispatcher {
        let mut dispatcher = JobDispatcher::new(HandlerRegistry::new());
        dispatcher.register(job_type, move || {
            instances.fetch_add(1, Ordering::SeqCst);
            let handler = CountingHandler {
                executions: executions.clone(),
                seen_job_id: seen_job_id.clone(),
            };
            async move { Ok(Box::new(handler) as BoxedHandler) }
        });
        dispatcher
    }

    #[tokio::test]
    async fn registered_type_runs_one_instance_one_execute() {
        let instances = Arc::new(AtomicUsize::new(0));
        let executions = Arc::new(AtomicUsize::new(0));
        let seen_job_id = Arc::new(AtomicUsize::new(0));
        let dispatcher = counting_dispatcher(
            "DATA_CURATION",
            instances.clone(),
            executions.clone(),
            seen_job_id.clone(),
        );

        dispatcher.dispatch(&job("DATA_CURATION")).await.unwrap();

        assert_eq!(instances.load(Ordering::SeqCst), 1);
        assert_eq!(executions.load(Ordering::SeqCst), 1);
        // The handler saw the record we dispatched, unmodified.
        assert_eq!(seen_job_id.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unregistered_type_resolves_without_invoking_anything() {
        let instances = Arc::new(AtomicUsize::new(0));
        let executions = Arc::new(AtomicUsize::new(0));
        let seen_job_id = Arc::new(AtomicUsize::new(0));
        let dispatcher = counting_dispatcher(
            "DATA_CURATION",
            instances.clone(),
            executions.clone(),
            seen_job_id,
        );

        dispatcher.dispatch(&job("UNKNOWN")).await.unwrap();

        assert_eq!(instances.load(Ordering::SeqCst), 0);
        assert_eq!(executions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn dispatch_on_empty_registry_is_ok() {
        let dispatcher = JobDispatcher::new(HandlerRegistry::new());
        dispatcher.dispatch(&job("ANYTHING")).await.unwrap();
    }

    #[tokio::test]
    async fn re_register_replaces_the_factory() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let mut dispatcher = JobDispatcher::new(HandlerRegistry::new());
        {
            let first = first.clone();
            dispatcher.register("T", move || {
                let executions = first.clone();
                async move {
                    Ok(Box::new(CountingHandler {
                        executions,
                        seen_job_id: Arc::new(AtomicUsize::new(0)),
                    }) as BoxedHandler)
                }
            });
        }
        {
            let second = second.clone();
            dispatcher.register("T", move || {
                let executions = second.clone();
                async move {
                    Ok(Box::new(CountingHandler {
                        executions,
                        seen_job_id: Arc::new(AtomicUsize::new(0)),
                    }) as BoxedHandler)
                }
            });
        }

        dispatcher.dispatch(&job("T")).await.unwrap();
        dispatcher.dispatch(&job("T")).await.unwrap();

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unregister_makes_the_type_unroutable() {
        let instances = Arc::new(AtomicUsize::new(0));
        let executions = Arc::new(AtomicUsize::new(0));
        let seen_job_id = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = counting_dispatcher(
            "FIELD_INFO_UPLOAD",
            instances.clone(),
            executions.clone(),
            seen_job_id,
        );

        dispatcher.unregister("FIELD_INFO_UPLOAD");
        dispatcher.dispatch(&job("FIELD_INFO_UPLOAD")).await.unwrap();

        assert!(!dispatcher.is_registered("FIELD_INFO_UPLOAD"));
        assert_eq!(instances.load(Ordering::SeqCst), 0);
        assert_eq!(executions.load(Ordering::SeqCst), 0);
    }

    /// Holds `execute` at a barrier until a second execution arrives.
    struct RendezvousHandler {
        barrier: Arc<Barrier>,
    }

    #[async_trait]
    impl JobHandler for RendezvousHandler {
        async fn execute(&self, _job: &Job) -> Result<(), ExecutorError> {
            self.barrier.wait().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn concurrent_dispatches_get_independent_instances() {
        let instances = Arc::new(AtomicUsize::new(0));
        // Both executions must be in flight at once for either to finish.
        let barrier = Arc::new(Barrier::new(2));

        let mut dispatcher = JobDispatcher::new(HandlerRegistry::new());
        {
            let instances = instances.clone();
            let barrier = barrier.clone();
            dispatcher.register("DATA_UPLOAD_CSV", move || {
                instances.fetch_add(1, Ordering::SeqCst);
                let handler = RendezvousHandler { barrier: barrier.clone() };
                async move { Ok(Box::new(handler) as BoxedHandler) }
            });
        }

        let record_a = job("DATA_UPLOAD_CSV");
        let record_b = job("DATA_UPLOAD_CSV");
        let (a, b) = tokio::join!(dispatcher.dispatch(&record_a), dispatcher.dispatch(&record_b));

        a.unwrap();
        b.unwrap();
        assert_eq!(instances.load(Ordering::SeqCst), 2);
    }

    struct FailingHandler;

    #[async_trait]
    impl JobHandler for FailingHandler {
        async fn execute(&self, _job: &Job) -> Result<(), ExecutorError> {
            Err(ExecutorError::Invalid(vec!["boom".to_string()]))
        }
    }

    #[tokio::test]
    async fn execute_failure_propagates_unwrapped() {
        let mut dispatcher = JobDispatcher::new(HandlerRegistry::new());
        dispatcher.register("EXPLODES", || async {
            Ok(Box::new(FailingHandler) as BoxedHandler)
        });

        let err = dispatcher.dispatch(&job("EXPLODES")).await.unwrap_err();

        assert_eq!(err.to_string(), "boom");
        assert_matches!(err, ExecutorError::Invalid(messages) if messages == ["boom"]);
    }

    #[tokio::test]
    async fn factory_failure_propagates_unwrapped() {
        let mut dispatcher = JobDispatcher::new(HandlerRegistry::new());
        dispatcher.register("NO_CONFIG", || async {
            Err(ExecutorError::Payload("store not configured".to_string()))
        });

        let err = dispatcher.dispatch(&job("NO_CONFIG")).await.unwrap_err();

        assert_matches!(err, ExecutorError::Payload(_));
        assert!(err.to_string().contains("store not configured"));
    }
}
