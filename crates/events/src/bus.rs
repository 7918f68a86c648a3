//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`JobStatusEvent`]s.
//! It is designed to be shared via `Arc<EventBus>` across the application.

use chrono::{DateTime, Utc};
use cohort_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// JobStatusEvent
// ---------------------------------------------------------------------------

/// A job status transition.
///
/// `status` carries the seeded spelling (`PENDING`, `PROCESSING`,
/// `FINISHED`, `ERROR`, `UNPROCESSED`) so subscribers can forward it
/// to clients verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusEvent {
    pub job_id: DbId,
    pub study_id: DbId,
    pub job_type: String,
    pub status: String,
    /// Error messages for ERROR transitions, empty otherwise.
    pub error: Vec<String>,
    /// When the transition was observed (UTC).
    pub timestamp: DateTime<Utc>,
}

impl JobStatusEvent {
    /// Create an event for a transition with no errors.
    pub fn new(job_id: DbId, study_id: DbId, job_type: impl Into<String>, status: &str) -> Self {
        Self {
            job_id,
            study_id,
            job_type: job_type.into(),
            status: status.to_string(),
            error: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Attach the error messages for an ERROR transition.
    pub fn with_error(mut self, error: Vec<String>) -> Self {
        self.error = error;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`JobStatusEvent`].
pub struct EventBus {
    sender: broadcast::Sender<JobStatusEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped;
    /// the database remains the source of truth for job state.
    pub fn publish(&self, event: JobStatusEvent) {
        // Ignore the SendError -- it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<JobStatusEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
