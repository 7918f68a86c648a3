//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - A `Deserialize` update DTO (all `Option` fields) where patches exist

pub mod data_record;
pub mod field;
pub mod file;
pub mod job;
pub mod project;
pub mod query;
pub mod role;
pub mod status;
pub mod study;
pub mod study_member;
pub mod user;
