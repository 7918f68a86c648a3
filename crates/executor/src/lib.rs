//! Asynchronous job execution for the Cohort platform.
//!
//! The heart of this crate is a small routing contract:
//!
//! - [`HandlerRegistry`] maps a job-type string to a factory producing a
//!   fresh handler per dispatch.
//! - [`JobDispatcher`] looks a job's type up in the registry and awaits the
//!   handler; unknown types are deliberately left alone.
//! - [`CurationLoop`] polls the `jobs` table, claims work, feeds it to the
//!   dispatcher, and owns the failure/unroutable bookkeeping the dispatcher
//!   refuses to do.
//!
//! Handlers for the platform's stock job types live in [`handlers`].

pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod handlers;
pub mod poller;
pub mod registry;

pub use dispatcher::JobDispatcher;
pub use error::ExecutorError;
pub use handler::{BoxedHandler, HandlerFactory, HandlerFuture, JobHandler};
pub use handlers::default_registry;
pub use poller::{CurationLoop, PollConfig};
pub use registry::HandlerRegistry;
