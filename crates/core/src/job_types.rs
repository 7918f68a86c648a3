//! Job-type identifiers understood by the curation executor.
//!
//! The dispatcher itself accepts any string; these constants exist so the
//! api crate and the executor registry agree on spelling. Handlers own the
//! payload schema for their type.

/// Curate an uploaded CSV file into data records for a study data version.
pub const DATA_UPLOAD_CSV: &str = "DATA_UPLOAD_CSV";

/// Curate an uploaded CSV of field definitions into the study's field
/// dictionary.
pub const FIELD_INFO_UPLOAD: &str = "FIELD_INFO_UPLOAD";

/// Execute a saved cohort query and store its result on the query row.
pub const QUERY_EXECUTION: &str = "QUERY_EXECUTION";

/// All job types the stock executor registers handlers for.
pub const ALL: &[&str] = &[DATA_UPLOAD_CSV, FIELD_INFO_UPLOAD, QUERY_EXECUTION];
