use std::sync::Arc;

use cohort_storage::FileStore;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: cohort_db::DbPool,
    /// Server configuration (accessed by middleware and handlers).
    pub config: Arc<ServerConfig>,
    /// Event bus carrying job status transitions to WebSocket clients.
    pub event_bus: Arc<cohort_events::EventBus>,
    /// Blob store for uploaded study files.
    pub file_store: Arc<dyn FileStore>,
}
