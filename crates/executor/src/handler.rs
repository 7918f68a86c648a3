//! The job-handler contract consumed by the dispatcher.

use async_trait::async_trait;
use cohort_db::models::job::Job;
use futures::future::BoxFuture;

use crate::error::ExecutorError;

/// Performs the work for one job type.
///
/// A handler owns its payload schema and the success-path bookkeeping for
/// its job (`FINISHED` status plus a JSON result summary). The dispatcher
/// only routes; the poll loop owns failure bookkeeping.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn execute(&self, job: &Job) -> Result<(), ExecutorError>;
}

/// A freshly constructed handler. One is produced per dispatch call and
/// dropped when `execute` returns; nothing is pooled or reused.
pub type BoxedHandler = Box<dyn JobHandler>;

/// The in-flight construction of a handler.
pub type HandlerFuture = BoxFuture<'static, Result<BoxedHandler, ExecutorError>>;

/// Zero-argument factory invoked lazily and independently on every
/// dispatch of its job type.
pub type HandlerFactory = Box<dyn Fn() -> HandlerFuture + Send + Sync>;
