//! Handler for `FIELD_INFO_UPLOAD`: curate an uploaded CSV of field
//! definitions into the study's field dictionary.
//!
//! Expected columns (header-mapped, any order):
//! `field_code,field_name,data_type,unit,possible_values,comments`.
//! `data_type` is a short code (`int|dec|str|bool|date|cat`);
//! `possible_values` is a JSON object mapping value code to description,
//! required for `cat` fields. Existing codes are updated in place, new
//! codes are created. Like data curation, the upload is all-or-nothing.

use std::collections::HashSet;
use std::sync::Arc;

use cohort_core::types::DbId;
use cohort_db::models::field::{CreateField, UpdateField};
use cohort_db::models::job::Job;
use cohort_db::models::status::FieldDataType;
use cohort_db::repositories::{FieldRepo, FileRepo, JobRepo};
use cohort_db::DbPool;
use cohort_storage::{FileStore, StoreError};
use serde::Deserialize;
use tokio::io::AsyncReadExt;

use crate::error::ExecutorError;
use crate::handler::JobHandler;

#[derive(Debug, Deserialize)]
struct FieldCurationPayload {
    file_id: DbId,
}

/// One row of the definitions CSV. Empty cells become `None`.
#[derive(Debug, Deserialize)]
struct FieldDefinitionRow {
    field_code: String,
    field_name: String,
    data_type: String,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    possible_values: Option<String>,
    #[serde(default)]
    comments: Option<String>,
}

pub struct FieldCurationHandler {
    pool: DbPool,
    store: Arc<dyn FileStore>,
}

impl FieldCurationHandler {
    pub fn new(pool: DbPool, store: Arc<dyn FileStore>) -> Self {
        Self { pool, store }
    }
}

#[async_trait::async_trait]
impl JobHandler for FieldCurationHandler {
    async fn execute(&self, job: &Job) -> Result<(), ExecutorError> {
        let payload: FieldCurationPayload = serde_json::from_value(job.payload.clone())
            .map_err(|e| ExecutorError::Payload(e.to_string()))?;

        let file = FileRepo::find_by_id(&self.pool, payload.file_id)
            .await?
            .ok_or_else(|| ExecutorError::Payload(format!("file {} not found", payload.file_id)))?;

        let mut stream = self.store.get(&file.uri).await?;
        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await.map_err(StoreError::Io)?;

        let definitions = parse_definitions(&raw)?;

        let mut created = 0u64;
        let mut updated = 0u64;
        for definition in &definitions {
            match FieldRepo::find_by_code(&self.pool, job.study_id, &definition.field_code).await? {
                Some(existing) => {
                    let patch = UpdateField {
                        field_name: Some(definition.field_name.clone()),
                        data_type_id: Some(definition.data_type_id),
                        unit: definition.unit.clone(),
                        possible_values: definition.possible_values.clone(),
                        comments: definition.comments.clone(),
                    };
                    FieldRepo::update(&self.pool, existing.id, &patch).await?;
                    updated += 1;
                }
                None => {
                    FieldRepo::create(&self.pool, job.study_id, definition).await?;
                    created += 1;
                }
            }
        }

        tracing::info!(
            job_id = job.id,
            file_id = file.id,
            created,
            updated,
            "Field curation complete"
        );

        let summary = serde_json::json!({
            "fields_created": created,
            "fields_updated": updated,
        });
        JobRepo::finish(&self.pool, job.id, &summary).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Definition parsing
// ---------------------------------------------------------------------------

/// Parse and validate the definitions CSV into create DTOs.
fn parse_definitions(raw: &[u8]) -> Result<Vec<CreateField>, ExecutorError> {
    let mut reader = csv::Reader::from_reader(raw);

    let headers = reader
        .headers()
        .map_err(|e| ExecutorError::Invalid(vec![format!("unreadable CSV header: {e}")]))?;
    for required in ["field_code", "field_name", "data_type"] {
        if !headers.iter().any(|h| h == required) {
            return Err(ExecutorError::Invalid(vec![format!(
                "header is missing the `{required}` column"
            )]));
        }
    }

    let mut errors = Vec::new();
    let mut definitions = Vec::new();
    let mut seen_codes = HashSet::new();

    for (row_idx, row) in reader.deserialize::<FieldDefinitionRow>().enumerate() {
        let line = row_idx + 2;
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                errors.push(format!("line {line}: {e}"));
                continue;
            }
        };

        if row.field_code.trim().is_empty() {
            errors.push(format!("line {line}: empty field_code"));
            continue;
        }
        if !seen_codes.insert(row.field_code.trim().to_string()) {
            errors.push(format!(
                "line {line}: duplicate definition for code `{}`",
                row.field_code.trim()
            ));
            continue;
        }
        if row.field_name.trim().is_empty() {
            errors.push(format!("line {line}: empty field_name"));
            continue;
        }

        let Some(data_type) = FieldDataType::from_code(row.data_type.trim()) else {
            errors.push(format!(
                "line {line}: unknown data type `{}` (expected int|dec|str|bool|date|cat)",
                row.data_type.trim()
            ));
            continue;
        };

        let possible_values = match &row.possible_values {
            Some(text) if !text.trim().is_empty() => {
                match serde_json::from_str::<serde_json::Value>(text) {
                    Ok(value) if value.is_object() => Some(value),
                    Ok(_) => {
                        errors.push(format!(
                            "line {line}: possible_values must be a JSON object"
                        ));
                        continue;
                    }
                    Err(e) => {
                        errors.push(format!("line {line}: possible_values is not JSON: {e}"));
                        continue;
                    }
                }
            }
            _ => None,
        };
        if data_type == FieldDataType::Categorical && possible_values.is_none() {
            errors.push(format!(
                "line {line}: categorical fields require possible_values"
            ));
            continue;
        }

        definitions.push(CreateField {
            field_code: row.field_code.trim().to_string(),
            field_name: row.field_name.trim().to_string(),
            data_type_id: data_type.id(),
            unit: row.unit.clone().filter(|u| !u.trim().is_empty()),
            possible_values,
            comments: row.comments.clone().filter(|c| !c.trim().is_empty()),
        });
    }

    if !errors.is_empty() {
        return Err(ExecutorError::Invalid(errors));
    }
    Ok(definitions)
}
