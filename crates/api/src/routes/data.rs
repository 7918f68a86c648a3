//! Route definitions for `/studies/{study_id}/data`.

use axum::routing::get;
use axum::Router;

use crate::handlers::data;
use crate::state::AppState;

/// Routes nested at `/studies/{study_id}/data`.
///
/// ```text
/// GET    /    -> list_records (filters + version pinning)
/// DELETE /    -> delete_records (manager, scoped)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(data::list_records).delete(data::delete_records))
}
