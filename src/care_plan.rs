//! Reentry care plan view.
//!
//! Turns a UI selection (a candidate plus the field labels the case
//! manager ticked) into renderer-ready rows:
//!
//! 1. resolve the candidate to a query (a `display_text` from
//!    [`resolve_candidates`](crate::candidates::resolve_candidates) pins
//!    the identifier);
//! 2. [`merge`] every source;
//! 3. emit one row per selected field, `"Not Available"` when the merged
//!    record has no usable value;
//! 4. append case notes via [`resolve_field`] when they were not selected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::assessment::cell_text;
use crate::config::ReportConfig;
use crate::error::{Error, Result};
use crate::fields::CanonicalField;
use crate::merge::{merge, resolve_field};
use crate::models::{Identity, SourceQuery, Warning};
use crate::normalize::normalize_selection;
use crate::traits::SourceRegistry;

/// Body of `POST /generate_reentry_care_plan`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SelectionRequest {
    #[serde(default)]
    pub selected_fields: Vec<String>,
    #[serde(default)]
    pub candidate_name: String,
}

impl SelectionRequest {
    /// The query for `candidate_name`: identifier and name when it is a
    /// candidate `display_text`, otherwise the plain name.
    pub fn query(&self) -> SourceQuery {
        match Identity::parse_display_text(&self.candidate_name) {
            Some((name, identifier)) => SourceQuery {
                name: Some(name),
                identifier: Some(identifier),
            },
            None => SourceQuery::by_name(self.candidate_name.trim()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CarePlanRow {
    pub field: String,
    pub value: String,
    /// False when `value` is the "not available" placeholder.
    pub available: bool,
}

/// What the plan says about one canonical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldStatus {
    Provided,
    NotAvailable,
    NotSelected,
}

#[derive(Debug, Clone, Serialize)]
pub struct CarePlan {
    pub title: String,
    pub candidate_name: String,
    pub identity: Option<Identity>,
    pub rows: Vec<CarePlanRow>,
    pub warnings: Vec<Warning>,
    pub generated_at: DateTime<Utc>,
}

impl CarePlan {
    pub fn status(&self, field: CanonicalField) -> FieldStatus {
        match self.rows.iter().find(|r| r.field == field.as_str()) {
            Some(row) if row.available => FieldStatus::Provided,
            Some(_) => FieldStatus::NotAvailable,
            None => FieldStatus::NotSelected,
        }
    }

    /// Cell text for `field`, including the "Not Selected" placeholder.
    pub fn rendered(&self, field: CanonicalField, report: &ReportConfig) -> String {
        match self.rows.iter().find(|r| r.field == field.as_str()) {
            Some(row) => row.value.clone(),
            None => report.not_selected.clone(),
        }
    }
}

/// Builds the care plan for a selection.
///
/// A blank `candidate_name` or an empty `selected_fields` is
/// [`Error::InvalidInput`]. Source failures only add warnings.
pub async fn build_care_plan(
    registry: &SourceRegistry,
    report: &ReportConfig,
    request: &SelectionRequest,
) -> Result<CarePlan> {
    if request.candidate_name.trim().is_empty() {
        return Err(Error::InvalidInput(
            "candidate_name must not be empty".to_string(),
        ));
    }
    if request.selected_fields.is_empty() {
        return Err(Error::InvalidInput(
            "selected_fields must not be empty".to_string(),
        ));
    }

    let query = request.query();
    let outcome = merge(registry, &query).await?;
    let selected = normalize_selection(&request.selected_fields);

    let mut rows: Vec<CarePlanRow> = selected
        .iter()
        .map(|field| row(field, outcome.record.get(field), report))
        .collect();

    let case_notes = CanonicalField::CaseNotes.as_str();
    if !selected.iter().any(|f| f == case_notes) {
        let notes = resolve_field(
            CanonicalField::CaseNotes,
            &outcome.per_source,
            Value::String(report.no_case_notes.clone()),
        );
        rows.push(row(case_notes, Some(&notes), report));
    }

    let identity = outcome.identity();
    let name = identity
        .as_ref()
        .map(|i| i.name.clone())
        .or_else(|| query.name.clone())
        .unwrap_or_else(|| request.candidate_name.trim().to_string());

    Ok(CarePlan {
        title: format!("{}'s Reentry Care Plan", name),
        candidate_name: name,
        identity,
        rows,
        warnings: outcome.warnings,
        generated_at: Utc::now(),
    })
}

fn row(field: &str, value: Option<&Value>, report: &ReportConfig) -> CarePlanRow {
    let text = value.map(cell_text).unwrap_or_default();
    if text.trim().is_empty() {
        CarePlanRow {
            field: field.to_string(),
            value: report.not_available.clone(),
            available: false,
        }
    } else {
        CarePlanRow {
            field: field.to_string(),
            value: text,
            available: true,
        }
    }
}
