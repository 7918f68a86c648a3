//! Route definitions for `/studies/{study_id}/fields`.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::fields;
use crate::state::AppState;

/// Routes nested at `/studies/{study_id}/fields`.
///
/// ```text
/// GET    /              -> list_fields
/// POST   /              -> create_field (manager)
/// PUT    /{field_id}    -> update_field (manager)
/// DELETE /{field_id}    -> delete_field (manager)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(fields::list_fields).post(fields::create_field))
        .route(
            "/{field_id}",
            put(fields::update_field).delete(fields::delete_field),
        )
}
