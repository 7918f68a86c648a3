//! Request handlers, one submodule per resource.
//!
//! Handlers delegate to the repositories in `cohort_db`, map errors via
//! [`crate::error::AppError`], and wrap success payloads in
//! [`crate::response::DataResponse`]. Study-scoped modules authorize
//! through [`crate::access`] before touching data.

pub mod admin;
pub mod auth;
pub mod data;
pub mod fields;
pub mod files;
pub mod jobs;
pub mod projects;
pub mod queries;
pub mod studies;
