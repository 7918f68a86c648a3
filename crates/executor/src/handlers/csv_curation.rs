//! Handler for `DATA_UPLOAD_CSV`: curate an uploaded CSV into data
//! records for one study data version.
//!
//! Expected layout: a header row `subject_id,visit_id,<field_code>...`
//! followed by one row per subject/visit. Every field-code column must
//! exist in the study's field dictionary and every cell must parse under
//! its field's data type. Curation is all-or-nothing: any validation
//! error aborts the job with the full error list and writes nothing.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate};
use cohort_core::types::DbId;
use cohort_db::models::data_record::NewDataRecord;
use cohort_db::models::field::Field;
use cohort_db::models::job::Job;
use cohort_db::models::status::FieldDataType;
use cohort_db::repositories::{DataRecordRepo, FieldRepo, FileRepo, JobRepo, StudyRepo};
use cohort_db::DbPool;
use cohort_storage::{FileStore, StoreError};
use serde::Deserialize;
use tokio::io::AsyncReadExt;

use crate::error::ExecutorError;
use crate::handler::JobHandler;

/// Row errors collected before curation gives up early.
const MAX_ROW_ERRORS: usize = 100;

#[derive(Debug, Deserialize)]
struct CsvCurationPayload {
    file_id: DbId,
    data_version_id: DbId,
}

pub struct CsvCurationHandler {
    pool: DbPool,
    store: Arc<dyn FileStore>,
}

impl CsvCurationHandler {
    pub fn new(pool: DbPool, store: Arc<dyn FileStore>) -> Self {
        Self { pool, store }
    }
}

#[async_trait::async_trait]
impl JobHandler for CsvCurationHandler {
    async fn execute(&self, job: &Job) -> Result<(), ExecutorError> {
        let payload: CsvCurationPayload = serde_json::from_value(job.payload.clone())
            .map_err(|e| ExecutorError::Payload(e.to_string()))?;

        let file = FileRepo::find_by_id(&self.pool, payload.file_id)
            .await?
            .ok_or_else(|| ExecutorError::Payload(format!("file {} not found", payload.file_id)))?;
        let version =
            StudyRepo::find_data_version(&self.pool, job.study_id, payload.data_version_id)
                .await?
                .ok_or_else(|| {
                    ExecutorError::Payload(format!(
                        "data version {} not found in study {}",
                        payload.data_version_id, job.study_id
                    ))
                })?;

        let fields = FieldRepo::list_for_study(&self.pool, job.study_id).await?;
        let dictionary: HashMap<&str, &Field> =
            fields.iter().map(|f| (f.field_code.as_str(), f)).collect();

        // Curation inputs are tabular exports, small next to the sensor
        // blobs that also pass through the file API, so buffering the
        // whole file is fine.
        let mut stream = self.store.get(&file.uri).await?;
        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await.map_err(StoreError::Io)?;

        let batch = parse_rows(&raw, &dictionary)?;

        let written = DataRecordRepo::upsert_batch(
            &self.pool,
            job.study_id,
            version.id,
            Some(file.id),
            &batch.records,
        )
        .await?;

        tracing::info!(
            job_id = job.id,
            file_id = file.id,
            data_version_id = version.id,
            rows = written,
            "CSV curation complete"
        );

        let summary = serde_json::json!({
            "rows_curated": written,
            "subjects": batch.subjects,
            "fields": batch.fields,
        });
        JobRepo::finish(&self.pool, job.id, &summary).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CSV parsing and value validation
// ---------------------------------------------------------------------------

/// Everything extracted from one valid CSV.
#[derive(Debug)]
struct CurationBatch {
    records: Vec<NewDataRecord>,
    /// Distinct subjects seen.
    subjects: usize,
    /// Field columns in the header.
    fields: usize,
}

/// Parse and validate the whole CSV against the field dictionary.
///
/// All errors are collected (up to [`MAX_ROW_ERRORS`]) so the user gets
/// one complete report instead of one error per resubmission.
fn parse_rows(
    raw: &[u8],
    dictionary: &HashMap<&str, &Field>,
) -> Result<CurationBatch, ExecutorError> {
    let mut reader = csv::Reader::from_reader(raw);
    let headers = reader
        .headers()
        .map_err(|e| ExecutorError::Invalid(vec![format!("unreadable CSV header: {e}")]))?
        .clone();

    let mut errors = Vec::new();

    if headers.len() < 3 {
        return Err(ExecutorError::Invalid(vec![
            "header must be subject_id,visit_id followed by at least one field code".to_string(),
        ]));
    }
    if headers.get(0) != Some("subject_id") || headers.get(1) != Some("visit_id") {
        errors.push(format!(
            "header must start with subject_id,visit_id (got {},{})",
            headers.get(0).unwrap_or(""),
            headers.get(1).unwrap_or(""),
        ));
    }

    // Resolve field columns up front so row errors can name the code.
    let mut columns: Vec<(usize, &Field)> = Vec::new();
    let mut seen_codes = HashSet::new();
    for (idx, code) in headers.iter().enumerate().skip(2) {
        if !seen_codes.insert(code) {
            errors.push(format!("duplicate column `{code}`"));
            continue;
        }
        match dictionary.get(code) {
            Some(field) => columns.push((idx, field)),
            None => errors.push(format!("column `{code}` is not in the field dictionary")),
        }
    }
    if !errors.is_empty() {
        return Err(ExecutorError::Invalid(errors));
    }

    let mut records = Vec::new();
    let mut subjects = HashSet::new();
    for (row_idx, row) in reader.records().enumerate() {
        // 1-based file line, counting the header.
        let line = row_idx + 2;
        if errors.len() >= MAX_ROW_ERRORS {
            errors.push(format!("aborted after {MAX_ROW_ERRORS} errors"));
            break;
        }
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                errors.push(format!("line {line}: {e}"));
                continue;
            }
        };

        let subject_id = row.get(0).unwrap_or("").trim();
        let visit_id = row.get(1).unwrap_or("").trim();
        if subject_id.is_empty() {
            errors.push(format!("line {line}: empty subject_id"));
            continue;
        }
        if visit_id.is_empty() {
            errors.push(format!("line {line}: empty visit_id"));
            continue;
        }

        for (idx, field) in &columns {
            let cell = row.get(*idx).unwrap_or("").trim();
            // Sparse cells are allowed; only present values become records.
            if cell.is_empty() {
                continue;
            }
            match parse_value(cell, field) {
                Ok(value) => records.push(NewDataRecord {
                    subject_id: subject_id.to_string(),
                    visit_id: visit_id.to_string(),
                    field_id: field.id,
                    value,
                }),
                Err(message) => {
                    errors.push(format!("line {line}, column `{}`: {message}", field.field_code));
                }
            }
        }
        subjects.insert(subject_id.to_string());
    }

    if !errors.is_empty() {
        return Err(ExecutorError::Invalid(errors));
    }

    Ok(CurationBatch { records, subjects: subjects.len(), fields: columns.len() })
}

/// Validate one cell against its field's data type and convert it to the
/// stored JSON value.
fn parse_value(cell: &str, field: &Field) -> Result<serde_json::Value, String> {
    let Some(data_type) = FieldDataType::from_id(field.data_type_id) else {
        return Err(format!("field has unknown data type id {}", field.data_type_id));
    };

    match data_type {
        FieldDataType::Integer => cell
            .parse::<i64>()
            .map(serde_json::Value::from)
            .map_err(|_| format!("`{cell}` is not an integer")),
        FieldDataType::Decimal => cell
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(serde_json::Value::Number)
            .ok_or_else(|| format!("`{cell}` is not a decimal")),
        FieldDataType::String => Ok(serde_json::Value::String(cell.to_string())),
        FieldDataType::Boolean => match cell.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(serde_json::Value::Bool(true)),
            "false" | "0" => Ok(serde_json::Value::Bool(false)),
            _ => Err(format!("`{cell}` is not a boolean")),
        },
        FieldDataType::Datetime => {
            let valid = DateTime::parse_from_rfc3339(cell).is_ok()
                || NaiveDate::parse_from_str(cell, "%Y-%m-%d").is_ok();
            if valid {
                // Stored as the original text; ISO ordering makes string
                // comparison in queries work.
                Ok(serde_json::Value::String(cell.to_string()))
            } else {
                Err(format!("`{cell}` is not a date (expected YYYY-MM-DD or RFC 3339)"))
            }
        }
        FieldDataType::Categorical => {
            let allowed = field
                .possible_values
                .as_ref()
                .and_then(|v| v.as_object())
                .is_some_and(|values| values.contains_key(cell));
            if allowed {
                Ok(serde_json::Value::String(cell.to_string()))
            } else {
                Err(format!("`{cell}` is not an allowed value for this field"))
            }
        }
    }
}
