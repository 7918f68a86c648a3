//! Route definitions for `/studies/{study_id}/queries`.

use axum::routing::get;
use axum::Router;

use crate::handlers::queries;
use crate::state::AppState;

/// Routes nested at `/studies/{study_id}/queries`.
///
/// ```text
/// GET    /               -> list_queries
/// POST   /               -> create_query (spawns the execution job)
/// GET    /{query_id}     -> get_query
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(queries::list_queries).post(queries::create_query))
        .route("/{query_id}", get(queries::get_query))
}
