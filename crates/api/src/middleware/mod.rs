//! Authentication and authorization middleware extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from a JWT Bearer token.
//! - [`rbac::RequireAdmin`] -- Requires the `admin` role.
//!
//! Study-scoped authorization (membership, manager flag) lives in
//! [`crate::access`] because it needs the study id from the request path.

pub mod auth;
pub mod rbac;
