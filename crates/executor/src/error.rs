//! Error type shared by the dispatcher, poll loop, and handlers.

/// Failure of a single job execution.
///
/// The dispatcher never catches these; they travel to the poll loop, which
/// persists them on the job row and publishes an `ERROR` event.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("file store error: {0}")]
    Store(#[from] cohort_storage::StoreError),

    /// The job payload does not match the handler's schema.
    #[error("invalid job payload: {0}")]
    Payload(String),

    /// The job's input failed validation (bad CSV rows, unknown field
    /// codes, malformed query document). The messages are user-facing and
    /// are stored verbatim on the job row.
    #[error("{}", .0.join("; "))]
    Invalid(Vec<String>),
}

impl ExecutorError {
    /// The messages to persist on the job row's error list.
    pub fn messages(&self) -> Vec<String> {
        match self {
            ExecutorError::Invalid(messages) => messages.clone(),
            other => vec![other.to_string()],
        }
    }
}
