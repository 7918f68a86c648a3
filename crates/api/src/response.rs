//! Shared response envelope for API handlers.
//!
//! Success payloads use a `{ "data": ... }` envelope (login is the one
//! exception; it returns the token response bare). Use [`DataResponse`]
//! instead of ad-hoc `serde_json::json!({ "data": ... })` to get
//! compile-time type safety and consistent serialization.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
