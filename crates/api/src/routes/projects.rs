//! Route definitions for `/studies/{study_id}/projects`.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::projects;
use crate::state::AppState;

/// Routes nested at `/studies/{study_id}/projects`.
///
/// ```text
/// GET    /                                  -> list_projects
/// POST   /                                  -> create_project (manager)
/// GET    /{project_id}                      -> get_project
/// DELETE /{project_id}                      -> delete_project (manager)
/// PUT    /{project_id}/approved-fields      -> set_approved_fields (manager)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(projects::list_projects).post(projects::create_project))
        .route(
            "/{project_id}",
            get(projects::get_project).delete(projects::delete_project),
        )
        .route(
            "/{project_id}/approved-fields",
            put(projects::set_approved_fields),
        )
}
