//! Stock handlers for the platform's job types.
//!
//! Each handler owns the payload schema for its type and the success-path
//! `FINISHED` write. They are constructed fresh per dispatch from cheap
//! clones (pool handle, `Arc` of the store).

use std::sync::Arc;

use cohort_core::job_types;
use cohort_db::DbPool;
use cohort_storage::FileStore;

use crate::handler::BoxedHandler;
use crate::registry::HandlerRegistry;

pub mod csv_curation;
pub mod field_curation;
pub mod query_execution;

pub use csv_curation::CsvCurationHandler;
pub use field_curation::FieldCurationHandler;
pub use query_execution::QueryExecutionHandler;

/// Build a registry with every production handler registered.
pub fn default_registry(pool: DbPool, store: Arc<dyn FileStore>) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();

    {
        let pool = pool.clone();
        let store = store.clone();
        registry.register(job_types::DATA_UPLOAD_CSV, move || {
            let handler = CsvCurationHandler::new(pool.clone(), store.clone());
            async move { Ok(Box::new(handler) as BoxedHandler) }
        });
    }
    {
        let pool = pool.clone();
        let store = store.clone();
        registry.register(job_types::FIELD_INFO_UPLOAD, move || {
            let handler = FieldCurationHandler::new(pool.clone(), store.clone());
            async move { Ok(Box::new(handler) as BoxedHandler) }
        });
    }
    {
        let pool = pool.clone();
        registry.register(job_types::QUERY_EXECUTION, move || {
            let handler = QueryExecutionHandler::new(pool.clone());
            async move { Ok(Box::new(handler) as BoxedHandler) }
        });
    }

    registry
}
