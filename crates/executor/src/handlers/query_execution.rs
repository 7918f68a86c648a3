//! Handler for `QUERY_EXECUTION`: run a saved cohort query against the
//! study's current data version and store the result on the query row.
//!
//! Query document shape (owned by this handler):
//!
//! ```json
//! {
//!   "filters": [ {"field_code": "age", "op": ">=", "value": 18} ],
//!   "data_requested": ["age", "sex"]
//! }
//! ```
//!
//! Filters are conjunctive and every filter requires its field to be
//! present for the subject/visit: `!=` on an absent value does not match.
//! `data_requested` projects the output; omitted means every (approved)
//! field. When the query belongs to a project, its `approved_fields` mask
//! bounds both filters and projection.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use cohort_core::types::DbId;
use cohort_db::models::field::Field;
use cohort_db::models::job::Job;
use cohort_db::models::query::SavedQuery;
use cohort_db::repositories::{DataRecordRepo, FieldRepo, JobRepo, ProjectRepo, QueryRepo, StudyRepo};
use cohort_db::DbPool;
use serde::Deserialize;

use crate::error::ExecutorError;
use crate::handler::JobHandler;

#[derive(Debug, Deserialize)]
struct QueryExecutionPayload {
    query_id: DbId,
}

#[derive(Debug, Deserialize)]
struct QueryDocument {
    #[serde(default)]
    filters: Vec<QueryFilter>,
    #[serde(default)]
    data_requested: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct QueryFilter {
    field_code: String,
    op: String,
    #[serde(default)]
    value: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Exists,
}

impl FilterOp {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "=" => Some(FilterOp::Eq),
            "!=" => Some(FilterOp::Ne),
            "<" => Some(FilterOp::Lt),
            ">" => Some(FilterOp::Gt),
            "<=" => Some(FilterOp::Le),
            ">=" => Some(FilterOp::Ge),
            "exists" => Some(FilterOp::Exists),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct CompiledFilter {
    field_id: DbId,
    op: FilterOp,
    value: serde_json::Value,
}

pub struct QueryExecutionHandler {
    pool: DbPool,
}

impl QueryExecutionHandler {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn run(&self, job: &Job, query: &SavedQuery) -> Result<serde_json::Value, ExecutorError> {
        let document: QueryDocument = serde_json::from_value(query.query.clone())
            .map_err(|e| ExecutorError::Invalid(vec![format!("malformed query document: {e}")]))?;

        let study = StudyRepo::find_by_id(&self.pool, job.study_id)
            .await?
            .ok_or_else(|| ExecutorError::Payload(format!("study {} not found", job.study_id)))?;
        let version_id = study.current_data_version_id.ok_or_else(|| {
            ExecutorError::Invalid(vec!["study has no current data version".to_string()])
        })?;

        let approved: Option<Vec<DbId>> = match query.project_id {
            Some(project_id) => {
                let project =
                    ProjectRepo::find_by_id(&self.pool, project_id).await?.ok_or_else(|| {
                        ExecutorError::Invalid(vec![format!("project {project_id} not found")])
                    })?;
                project.approved_fields
            }
            None => None,
        };

        let fields = FieldRepo::list_for_study(&self.pool, job.study_id).await?;
        let by_code: HashMap<&str, &Field> =
            fields.iter().map(|f| (f.field_code.as_str(), f)).collect();
        let code_of: HashMap<DbId, &str> =
            fields.iter().map(|f| (f.id, f.field_code.as_str())).collect();

        let filters = compile_filters(&document.filters, &by_code, approved.as_deref())?;
        let projection = match &document.data_requested {
            Some(codes) => Some(compile_projection(codes, &by_code, approved.as_deref())?),
            None => None,
        };

        let records = DataRecordRepo::all_for_version(
            &self.pool,
            job.study_id,
            version_id,
            approved.as_deref(),
        )
        .await?;

        // Pivot records into one value map per subject/visit.
        let mut groups: BTreeMap<(String, String), HashMap<DbId, serde_json::Value>> =
            BTreeMap::new();
        for record in records {
            groups
                .entry((record.subject_id, record.visit_id))
                .or_default()
                .insert(record.field_id, record.value);
        }

        let mut rows = Vec::new();
        let mut subjects = HashSet::new();
        for ((subject_id, visit_id), values) in &groups {
            if !row_matches(values, &filters) {
                continue;
            }
            let mut projected = serde_json::Map::new();
            for (field_id, value) in values {
                if let Some(keep) = &projection {
                    if !keep.contains(field_id) {
                        continue;
                    }
                }
                // Every loaded record's field is in the dictionary.
                if let Some(code) = code_of.get(field_id) {
                    projected.insert((*code).to_string(), value.clone());
                }
            }
            subjects.insert(subject_id.clone());
            rows.push(serde_json::json!({
                "subject_id": subject_id,
                "visit_id": visit_id,
                "values": projected,
            }));
        }

        let row_count = rows.len();
        QueryRepo::complete(&self.pool, query.id, &serde_json::Value::Array(rows)).await?;

        Ok(serde_json::json!({
            "rows": row_count,
            "subjects": subjects.len(),
            "data_version_id": version_id,
        }))
    }
}

#[async_trait::async_trait]
impl JobHandler for QueryExecutionHandler {
    async fn execute(&self, job: &Job) -> Result<(), ExecutorError> {
        let payload: QueryExecutionPayload = serde_json::from_value(job.payload.clone())
            .map_err(|e| ExecutorError::Payload(e.to_string()))?;

        let query = QueryRepo::find_by_id(&self.pool, payload.query_id)
            .await?
            .ok_or_else(|| {
                ExecutorError::Payload(format!("query {} not found", payload.query_id))
            })?;
        if query.study_id != job.study_id {
            return Err(ExecutorError::Payload(format!(
                "query {} does not belong to study {}",
                query.id, job.study_id
            )));
        }

        QueryRepo::mark_running(&self.pool, query.id).await?;

        match self.run(job, &query).await {
            Ok(summary) => {
                tracing::info!(job_id = job.id, query_id = query.id, "Query execution complete");
                JobRepo::finish(&self.pool, job.id, &summary).await?;
                Ok(())
            }
            Err(e) => {
                // The query row carries its own error status for the UI.
                QueryRepo::fail(&self.pool, query.id, &e.to_string()).await?;
                Err(e)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Filter compilation and evaluation
// ---------------------------------------------------------------------------

/// Resolve filter codes/operators against the dictionary and the project
/// mask. All problems are reported at once.
fn compile_filters(
    filters: &[QueryFilter],
    by_code: &HashMap<&str, &Field>,
    approved: Option<&[DbId]>,
) -> Result<Vec<CompiledFilter>, ExecutorError> {
    let mut errors = Vec::new();
    let mut compiled = Vec::new();

    for filter in filters {
        let field = match by_code.get(filter.field_code.as_str()) {
            Some(field) => *field,
            None => {
                errors.push(format!(
                    "filter field `{}` is not in the field dictionary",
                    filter.field_code
                ));
                continue;
            }
        };
        if let Some(mask) = approved {
            if !mask.contains(&field.id) {
                errors.push(format!(
                    "filter field `{}` is not approved for this project",
                    filter.field_code
                ));
                continue;
            }
        }
        let Some(op) = FilterOp::parse(&filter.op) else {
            errors.push(format!(
                "unknown operator `{}` (expected =, !=, <, >, <=, >= or exists)",
                filter.op
            ));
            continue;
        };
        compiled.push(CompiledFilter { field_id: field.id, op, value: filter.value.clone() });
    }

    if !errors.is_empty() {
        return Err(ExecutorError::Invalid(errors));
    }
    Ok(compiled)
}

/// Resolve the `data_requested` projection to field ids.
fn compile_projection(
    codes: &[String],
    by_code: &HashMap<&str, &Field>,
    approved: Option<&[DbId]>,
) -> Result<HashSet<DbId>, ExecutorError> {
    let mut errors = Vec::new();
    let mut keep = HashSet::new();

    for code in codes {
        let field = match by_code.get(code.as_str()) {
            Some(field) => *field,
            None => {
                errors.push(format!("requested field `{code}` is not in the field dictionary"));
                continue;
            }
        };
        if let Some(mask) = approved {
            if !mask.contains(&field.id) {
                errors.push(format!("requested field `{code}` is not approved for this project"));
                continue;
            }
        }
        keep.insert(field.id);
    }

    if !errors.is_empty() {
        return Err(ExecutorError::Invalid(errors));
    }
    Ok(keep)
}

/// Conjunctive filter evaluation over one subject/visit value map.
fn row_matches(values: &HashMap<DbId, serde_json::Value>, filters: &[CompiledFilter]) -> bool {
    filters.iter().all(|filter| {
        let Some(actual) = values.get(&filter.field_id) else {
            return false;
        };
        match filter.op {
            FilterOp::Exists => true,
            FilterOp::Eq => values_equal(actual, &filter.value),
            FilterOp::Ne => !values_equal(actual, &filter.value),
            FilterOp::Lt | FilterOp::Gt | FilterOp::Le | FilterOp::Ge => {
                match value_ordering(actual, &filter.value) {
                    Some(ordering) => match filter.op {
                        FilterOp::Lt => ordering == Ordering::Less,
                        FilterOp::Gt => ordering == Ordering::Greater,
                        FilterOp::Le => ordering != Ordering::Greater,
                        FilterOp::Ge => ordering != Ordering::Less,
                        _ => unreachable!(),
                    },
                    // Incomparable types never match.
                    None => false,
                }
            }
        }
    })
}

/// Equality with numeric widening, so `5` matches `5.0`.
fn values_equal(a: &serde_json::Value, b: &serde_json::Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Ordering for homogeneous scalar pairs; `None` when the values cannot
/// be compared. ISO date strings order correctly as strings.
fn value_ordering(a: &serde_json::Value, b: &serde_json::Value) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x.partial_cmp(&y);
    }
    if let (Some(x), Some(y)) = (a.as_str(), b.as_str()) {
        return Some(x.cmp(y));
    }
    None
}
