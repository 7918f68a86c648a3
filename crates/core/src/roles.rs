//! Well-known role name constants.
//!
//! These must match the seed data in `0001_lookup_tables.sql`.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_STANDARD: &str = "standard";
