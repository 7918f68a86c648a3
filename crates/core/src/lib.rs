//! Shared domain primitives for the Cohort platform.
//!
//! Everything here is dependency-light so that every other crate (db,
//! storage, executor, api) can pull from it without cycles.

pub mod error;
pub mod job_types;
pub mod naming;
pub mod roles;
pub mod types;
