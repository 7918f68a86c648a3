//! In-process job status event distribution.
//!
//! The poll loop publishes a [`JobStatusEvent`] for every status
//! transition it performs, and the API publishes one on submission.
//! WebSocket connections subscribe and forward events for their study.

pub mod bus;

pub use bus::{EventBus, JobStatusEvent};
