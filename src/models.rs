//! Core data models shared by the adapters, the resolver and the merger.
//!
//! Records are flat maps from field name to a JSON scalar. A `BTreeMap`
//! keeps iteration order stable so every downstream step is deterministic
//! for identical adapter responses.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::fields::CanonicalField;

/// A row as returned by a source adapter, keyed by the source's own
/// spelling of each column.
pub type RawRecord = BTreeMap<String, Value>;

/// A row after alias substitution: canonical spellings where known,
/// original keys otherwise.
pub type NormalizedRecord = BTreeMap<String, Value>;

/// The flattened view of one person after applying source precedence.
pub type MergedRecord = BTreeMap<String, Value>;

/// Phone/address placeholder for identities missing either value.
pub const NOT_PROVIDED: &str = "N/A";

/// The three backing stores, in the order they are declared in config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Spreadsheet,
    Relational,
    Warehouse,
}

impl SourceKind {
    /// Merge precedence: later entries overwrite earlier ones.
    pub const MERGE_ORDER: [SourceKind; 3] = [
        SourceKind::Spreadsheet,
        SourceKind::Relational,
        SourceKind::Warehouse,
    ];

    /// Candidate dedup visiting order: first identity seen for an
    /// identifier is kept.
    pub const DEDUP_ORDER: [SourceKind; 3] = [
        SourceKind::Spreadsheet,
        SourceKind::Relational,
        SourceKind::Warehouse,
    ];

    /// Case-notes lookup order. Deliberately not the merge order.
    pub const CASE_NOTES_ORDER: [SourceKind; 3] = [
        SourceKind::Relational,
        SourceKind::Warehouse,
        SourceKind::Spreadsheet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Spreadsheet => "spreadsheet",
            SourceKind::Relational => "relational",
            SourceKind::Warehouse => "warehouse",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Search key handed to every adapter.
///
/// When both fields are set the identifier wins: names are not unique,
/// identifiers are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceQuery {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub identifier: Option<String>,
}

impl SourceQuery {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            identifier: None,
        }
    }

    pub fn by_identifier(identifier: impl Into<String>) -> Self {
        Self {
            name: None,
            identifier: Some(identifier.into()),
        }
    }

    /// The effective filter, or `None` when neither field is usable.
    pub fn filter(&self) -> Option<QueryFilter<'_>> {
        if let Some(id) = non_blank(&self.identifier) {
            return Some(QueryFilter::Identifier(id));
        }
        non_blank(&self.name).map(QueryFilter::Name)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Which column a query filters on, with the trimmed search value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryFilter<'a> {
    Identifier(&'a str),
    Name(&'a str),
}

impl QueryFilter<'_> {
    /// In-process match against a normalized record.
    ///
    /// Names compare trimmed and case-insensitively; identifiers compare
    /// trimmed and exactly. Neither is a substring match.
    pub fn matches(&self, record: &NormalizedRecord) -> bool {
        match self {
            QueryFilter::Identifier(id) => record
                .get(CanonicalField::MedicalIdNumber.as_str())
                .map(|v| value_text(v).trim() == *id)
                .unwrap_or(false),
            QueryFilter::Name(name) => record
                .get(CanonicalField::YouthName.as_str())
                .map(|v| value_text(v).trim().to_lowercase() == name.to_lowercase())
                .unwrap_or(false),
        }
    }
}

/// Distinguishes same-named people across sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub name: String,
    #[serde(rename = "medical_id")]
    pub identifier: String,
    pub phone: String,
    pub address: String,
    pub display_text: String,
}

impl Identity {
    /// Extracts an identity from a normalized record.
    ///
    /// Returns `None` unless both name and identifier are non-empty after
    /// trimming.
    pub fn from_record(record: &NormalizedRecord) -> Option<Self> {
        let text = |field: CanonicalField| {
            record
                .get(field.as_str())
                .map(|v| value_text(v).trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let name = text(CanonicalField::YouthName)?;
        let identifier = text(CanonicalField::MedicalIdNumber)?;
        let phone = text(CanonicalField::Telephone).unwrap_or_else(|| NOT_PROVIDED.to_string());
        let address =
            text(CanonicalField::ResidentialAddress).unwrap_or_else(|| NOT_PROVIDED.to_string());

        let display_text = format!(
            "{} (ID: {}, Phone: {}, Address: {})",
            name, identifier, phone, address
        );

        Some(Self {
            name,
            identifier,
            phone,
            address,
            display_text,
        })
    }

    /// Recovers `(name, identifier)` from a `display_text` produced by
    /// [`Identity::from_record`]. Plain names return `None`.
    pub fn parse_display_text(text: &str) -> Option<(String, String)> {
        let (name, rest) = text.split_once(" (ID: ")?;
        let end = rest.find([',', ')'])?;
        let identifier = rest[..end].trim();
        let name = name.trim();
        if name.is_empty() || identifier.is_empty() {
            return None;
        }
        Some((name.to_string(), identifier.to_string()))
    }
}

/// A non-fatal condition attached to an outcome envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// The source failed, timed out, or rejected the query; it contributed
    /// nothing.
    SourceUnavailable { source: SourceKind, reason: String },
    /// No adapter is registered for the source.
    SourceNotConfigured { source: SourceKind },
    /// The source returned several rows where one was expected; the first
    /// row was used.
    AmbiguousMatch { source: SourceKind, rows: usize },
}

impl Warning {
    /// True when a configured source failed, as opposed to being absent.
    pub fn is_outage(&self) -> bool {
        matches!(self, Warning::SourceUnavailable { .. })
    }

    pub fn source(&self) -> SourceKind {
        match self {
            Warning::SourceUnavailable { source, .. }
            | Warning::SourceNotConfigured { source }
            | Warning::AmbiguousMatch { source, .. } => *source,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::SourceUnavailable { source, reason } => {
                write!(f, "{} source unavailable: {}", source, reason)
            }
            Warning::SourceNotConfigured { source } => {
                write!(f, "{} source not configured", source)
            }
            Warning::AmbiguousMatch { source, rows } => {
                write!(f, "{} source returned {} rows, using the first", source, rows)
            }
        }
    }
}

/// The normalized row each source contributed to a merge (empty when the
/// source had nothing).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerSource {
    pub spreadsheet: NormalizedRecord,
    pub relational: NormalizedRecord,
    pub warehouse: NormalizedRecord,
}

impl PerSource {
    pub fn get(&self, kind: SourceKind) -> &NormalizedRecord {
        match kind {
            SourceKind::Spreadsheet => &self.spreadsheet,
            SourceKind::Relational => &self.relational,
            SourceKind::Warehouse => &self.warehouse,
        }
    }

    pub fn set(&mut self, kind: SourceKind, record: NormalizedRecord) {
        match kind {
            SourceKind::Spreadsheet => self.spreadsheet = record,
            SourceKind::Relational => self.relational = record,
            SourceKind::Warehouse => self.warehouse = record,
        }
    }
}

/// Renders a scalar as display text.
///
/// Whole floats print without a fractional part so identifiers read from
/// spreadsheets (`5952280034.0`) match their database spelling.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
                    Some(f) => f.to_string(),
                    None => n.to_string(),
                }
            }
        }
        other => other.to_string(),
    }
}

/// Null, or a string that is empty after trimming.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}
