//! Record merging.
//!
//! [`merge`] fetches one person from every source, normalizes each row and
//! folds them into a single [`MergedRecord`]:
//!
//! ```text
//! spreadsheet ──┐
//! relational  ──┼──▶ normalize ──▶ overwrite in merge order ──▶ strip `id`
//! warehouse   ──┘
//! ```
//!
//! Later sources overwrite earlier ones field by field, so the warehouse
//! wins any conflict. Fields a later source lacks keep the earlier value.
//!
//! [`resolve_field`] is a separate lookup with its own order
//! (Relational, Warehouse, Spreadsheet) used for case notes.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::error::{Error, Result};
use crate::fields::CanonicalField;
use crate::models::{
    is_blank, Identity, MergedRecord, NormalizedRecord, PerSource, SourceKind, SourceQuery,
    Warning,
};
use crate::normalize::normalize_record;
use crate::sources::fetch_all;
use crate::traits::SourceRegistry;

/// Keys that only make sense inside one backing store.
const INTERNAL_KEYS: &[&str] = &["id"];

/// Result envelope of [`merge`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergeOutcome {
    pub record: MergedRecord,
    pub per_source: PerSource,
    pub warnings: Vec<Warning>,
}

impl MergeOutcome {
    /// Identity of the merged person, when name and identifier are known.
    pub fn identity(&self) -> Option<Identity> {
        Identity::from_record(&self.record)
    }

    pub fn is_empty(&self) -> bool {
        self.record.is_empty()
    }
}

/// Merges every source's first matching row for `query`.
///
/// A query with neither a name nor an identifier is
/// [`Error::InvalidInput`]. A person found nowhere yields an empty record.
pub async fn merge(registry: &SourceRegistry, query: &SourceQuery) -> Result<MergeOutcome> {
    if query.filter().is_none() {
        return Err(Error::InvalidInput(
            "merge needs a name or an identifier".to_string(),
        ));
    }

    let fan_out = fetch_all(registry, query).await;
    let mut warnings = fan_out.warnings.clone();
    let mut per_source = PerSource::default();

    for kind in SourceKind::MERGE_ORDER {
        let rows = fan_out.rows(kind);
        if rows.len() > 1 {
            warn!(source = %kind, rows = rows.len(), "ambiguous match, using the first row");
            warnings.push(Warning::AmbiguousMatch {
                source: kind,
                rows: rows.len(),
            });
        }
        if let Some(first) = rows.first() {
            per_source.set(kind, strip_internal(normalize_record(first.clone())));
        }
    }

    Ok(MergeOutcome {
        record: merge_records(&per_source),
        per_source,
        warnings,
    })
}

/// Overlays the per-source rows in merge order and drops internal keys.
pub fn merge_records(per_source: &PerSource) -> MergedRecord {
    let mut merged = MergedRecord::new();
    for kind in SourceKind::MERGE_ORDER {
        overlay(&mut merged, per_source.get(kind));
    }
    strip_internal(merged)
}

fn strip_internal(mut record: NormalizedRecord) -> NormalizedRecord {
    for key in INTERNAL_KEYS {
        record.remove(*key);
    }
    record
}

fn overlay(merged: &mut MergedRecord, record: &NormalizedRecord) {
    for (key, value) in record {
        merged.insert(key.clone(), value.clone());
    }
}

/// First non-blank value of `field` in Relational, Warehouse, Spreadsheet
/// order, or `default`.
pub fn resolve_field(field: CanonicalField, per_source: &PerSource, default: Value) -> Value {
    SourceKind::CASE_NOTES_ORDER
        .iter()
        .filter_map(|kind| per_source.get(*kind).get(field.as_str()))
        .find(|value| !is_blank(value))
        .cloned()
        .unwrap_or(default)
}
