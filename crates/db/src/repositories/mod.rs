//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod data_record_repo;
pub mod field_repo;
pub mod file_repo;
pub mod job_repo;
pub mod project_repo;
pub mod query_repo;
pub mod role_repo;
pub mod study_member_repo;
pub mod study_repo;
pub mod user_repo;

pub use data_record_repo::DataRecordRepo;
pub use field_repo::FieldRepo;
pub use file_repo::FileRepo;
pub use job_repo::JobRepo;
pub use project_repo::ProjectRepo;
pub use query_repo::QueryRepo;
pub use role_repo::RoleRepo;
pub use study_member_repo::StudyMemberRepo;
pub use study_repo::StudyRepo;
pub use user_repo::UserRepo;
