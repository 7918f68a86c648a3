//! Route definitions for `/studies/{study_id}/files`.

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use cohort_core::naming::FILE_SIZE_LIMIT;

use crate::handlers::files;
use crate::state::AppState;

/// Routes nested at `/studies/{study_id}/files`.
///
/// The default Axum body limit (2 MB) would reject real uploads, so this
/// router raises it to the platform's 8 GiB file cap.
///
/// ```text
/// GET    /                       -> list_files
/// POST   /                       -> upload_file (multipart)
/// GET    /{file_id}              -> get_file
/// DELETE /{file_id}              -> delete_file (manager)
/// GET    /{file_id}/download     -> download_file (streamed)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(files::list_files).post(files::upload_file))
        .route(
            "/{file_id}",
            get(files::get_file).delete(files::delete_file),
        )
        .route("/{file_id}/download", get(files::download_file))
        .layer(DefaultBodyLimit::max(FILE_SIZE_LIMIT as usize))
}
