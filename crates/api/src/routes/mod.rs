pub mod admin;
pub mod auth;
pub mod data;
pub mod fields;
pub mod files;
pub mod health;
pub mod jobs;
pub mod projects;
pub mod queries;
pub mod studies;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws/jobs                                          job status WebSocket
///
/// /auth/login                                       login (public)
/// /auth/whoami                                      current user (auth)
///
/// /admin/users                                      list, create (admin only)
/// /admin/users/{id}                                 get, update, deactivate
/// /admin/users/{id}/reset-password                  reset password (POST)
///
/// /studies                                          list, create
/// /studies/{id}                                     get, update, delete
/// /studies/{id}/members                             list, add
/// /studies/{id}/members/{user_id}                   remove (DELETE)
/// /studies/{id}/data-versions                       list, create
/// /studies/{id}/data-versions/{vid}/current         set current (POST)
///
/// /studies/{id}/projects                            list, create
/// /studies/{id}/projects/{pid}                      get, delete
/// /studies/{id}/projects/{pid}/approved-fields      replace mask (PUT)
///
/// /studies/{id}/fields                              list, create
/// /studies/{id}/fields/{fid}                        update, delete
///
/// /studies/{id}/files                               list, upload (multipart)
/// /studies/{id}/files/{fid}                         get, delete
/// /studies/{id}/files/{fid}/download                stream attachment (GET)
///
/// /studies/{id}/data                                query records (GET), delete scoped (DELETE)
///
/// /studies/{id}/jobs                                list, submit
/// /studies/{id}/jobs/{jid}                          get job (GET)
/// /studies/{id}/jobs/{jid}/cancel                   cancel pending job (POST)
///
/// /studies/{id}/queries                             list, create (spawns execution)
/// /studies/{id}/queries/{qid}                       get with result (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Job status WebSocket feed.
        .route("/ws/jobs", get(ws::ws_handler))
        // Authentication (login, whoami).
        .nest("/auth", auth::router())
        // Admin user management.
        .nest("/admin", admin::router())
        // Studies and every study-scoped resource.
        .nest("/studies", studies::router())
}
