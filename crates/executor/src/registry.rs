//! Mapping from job-type identifiers to handler factories.

use std::collections::HashMap;
use std::future::Future;

use crate::error::ExecutorError;
use crate::handler::{BoxedHandler, HandlerFactory, HandlerFuture};

/// Owned mapping from job-type string to handler factory.
///
/// Built at process startup and handed to [`JobDispatcher`]; mutation takes
/// `&mut self`, so once the dispatcher is shared behind an `Arc` the mapping
/// is fixed. No job-type format validation is performed: any non-empty
/// string a producer writes can be routed.
///
/// [`JobDispatcher`]: crate::dispatcher::JobDispatcher
pub struct HandlerRegistry {
    factories: HashMap<String, HandlerFactory>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self { factories: HashMap::new() }
    }

    /// Insert the factory for `job_type`, silently replacing any previous
    /// registration.
    pub fn register<F, Fut>(&mut self, job_type: impl Into<String>, factory: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<BoxedHandler, ExecutorError>> + Send + 'static,
    {
        self.factories
            .insert(job_type.into(), Box::new(move || Box::pin(factory())));
    }

    /// Remove the factory for `job_type`. Unknown types are a no-op.
    pub fn unregister(&mut self, job_type: &str) {
        self.factories.remove(job_type);
    }

    /// Whether a factory is currently registered for `job_type`.
    pub fn contains(&self, job_type: &str) -> bool {
        self.factories.contains_key(job_type)
    }

    /// Start constructing a fresh handler for `job_type`.
    ///
    /// Returns `None` for unregistered types; the factory is invoked anew
    /// on every call.
    pub(crate) fn instantiate(&self, job_type: &str) -> Option<HandlerFuture> {
        self.factories.get(job_type).map(|factory| factory())
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
