//! Route definitions for `/studies` and its nested resources.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::studies;
use crate::routes::{data, fields, files, jobs, projects, queries};
use crate::state::AppState;

/// Routes mounted at `/studies`.
///
/// ```text
/// GET    /                                          -> list_studies
/// POST   /                                          -> create_study (admin)
/// GET    /{study_id}                                -> get_study
/// PUT    /{study_id}                                -> update_study (manager)
/// DELETE /{study_id}                                -> delete_study (admin)
/// GET    /{study_id}/members                        -> list_members
/// POST   /{study_id}/members                        -> add_member (manager)
/// DELETE /{study_id}/members/{user_id}              -> remove_member (manager)
/// GET    /{study_id}/data-versions                  -> list_data_versions
/// POST   /{study_id}/data-versions                  -> create_data_version (manager)
/// POST   /{study_id}/data-versions/{vid}/current    -> set_current_data_version (manager)
///
/// Nested: /{study_id}/projects, /{study_id}/fields, /{study_id}/files,
///         /{study_id}/data, /{study_id}/jobs, /{study_id}/queries
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(studies::list_studies).post(studies::create_study))
        .route(
            "/{study_id}",
            get(studies::get_study)
                .put(studies::update_study)
                .delete(studies::delete_study),
        )
        .route(
            "/{study_id}/members",
            get(studies::list_members).post(studies::add_member),
        )
        .route(
            "/{study_id}/members/{user_id}",
            delete(studies::remove_member),
        )
        .route(
            "/{study_id}/data-versions",
            get(studies::list_data_versions).post(studies::create_data_version),
        )
        .route(
            "/{study_id}/data-versions/{version_id}/current",
            post(studies::set_current_data_version),
        )
        .nest("/{study_id}/projects", projects::router())
        .nest("/{study_id}/fields", fields::router())
        .nest("/{study_id}/files", files::router())
        .nest("/{study_id}/data", data::router())
        .nest("/{study_id}/jobs", jobs::router())
        .nest("/{study_id}/queries", queries::router())
}
