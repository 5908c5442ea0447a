//! Field normalization.
//!
//! Applies the [canonicalization table](crate::fields) to a single
//! source row and to a UI-provided list of field labels. Both functions
//! are pure and idempotent.

use tracing::debug;

use crate::fields::CanonicalField;
use crate::models::{is_blank, NormalizedRecord, RawRecord};

/// Renames every known key to its canonical spelling.
///
/// Unknown keys pass through verbatim. If two raw keys collapse onto the
/// same canonical field, the first non-blank value in key order wins.
pub fn normalize_record(raw: RawRecord) -> NormalizedRecord {
    let mut normalized = NormalizedRecord::new();

    for (key, value) in raw {
        let target = match CanonicalField::lookup(&key) {
            Some(field) => field.as_str().to_string(),
            None => {
                debug!(field = %key, "no canonical alias for field, passing through");
                key
            }
        };

        match normalized.get(&target) {
            Some(existing) if !is_blank(existing) => {}
            _ => {
                normalized.insert(target, value);
            }
        }
    }

    normalized
}

/// Maps UI labels onto canonical spellings, keeping order and duplicates.
///
/// A trailing source tag such as `" (CM)"` or `" (Excel)"` is dropped first:
/// everything from the first `" ("` onwards is ignored. Labels with no
/// alias are returned trimmed.
pub fn normalize_selection<S: AsRef<str>>(labels: &[S]) -> Vec<String> {
    labels
        .iter()
        .map(|label| normalize_label(label.as_ref()))
        .collect()
}

/// Normalizes a single UI label. See [`normalize_selection`].
pub fn normalize_label(label: &str) -> String {
    let stripped = match label.find(" (") {
        Some(idx) => &label[..idx],
        None => label,
    }
    .trim();

    match CanonicalField::lookup(stripped) {
        Some(field) => field.as_str().to_string(),
        None => {
            debug!(label = %stripped, "no canonical alias for selected label");
            stripped.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::ALIASES;
    use serde_json::{json, Value};

    fn raw(pairs: &[(&str, Value)]) -> RawRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_relational_columns_are_renamed() {
        let record = normalize_record(raw(&[
            ("youth_name", json!("John Doe")),
            ("medical_id_number", json!("5952280034")),
            ("case_notes", json!("Met with mentor")),
        ]));
        assert_eq!(record.get("Name of the youth"), Some(&json!("John Doe")));
        assert_eq!(record.get("Medical ID Number"), Some(&json!("5952280034")));
        assert_eq!(record.get("Case Notes"), Some(&json!("Met with mentor")));
        assert!(!record.contains_key("youth_name"));
    }

    #[test]
    fn test_no_raw_alias_survives_normalization() {
        let input: RawRecord = ALIASES
            .iter()
            .enumerate()
            .map(|(i, (alias, _))| (alias.to_string(), json!(i)))
            .collect();
        let record = normalize_record(input);
        for key in record.keys() {
            let field = CanonicalField::lookup(key).unwrap();
            assert_eq!(key, field.as_str());
        }
    }

    #[test]
    fn test_unmapped_fields_pass_through() {
        let record = normalize_record(raw(&[("id", json!(7)), ("favorite_color", json!("blue"))]));
        assert_eq!(record.get("id"), Some(&json!(7)));
        assert_eq!(record.get("favorite_color"), Some(&json!("blue")));
    }

    #[test]
    fn test_record_normalization_is_idempotent() {
        let once = normalize_record(raw(&[
            ("youth_name", json!("John Doe")),
            ("Housing", json!("Transitional")),
            ("id", json!(3)),
            ("telephone", Value::Null),
        ]));
        let twice = normalize_record(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_collapsed_keys_prefer_non_blank_value() {
        let record = normalize_record(raw(&[
            ("Telephone", json!("")),
            ("phone", json!("555-0100")),
        ]));
        assert_eq!(record.get("Telephone"), Some(&json!("555-0100")));

        let record = normalize_record(raw(&[
            ("Telephone", json!("555-0199")),
            ("phone", json!("555-0100")),
        ]));
        assert_eq!(record.get("Telephone"), Some(&json!("555-0199")));
    }

    #[test]
    fn test_selection_strips_source_suffix_and_maps_labels() {
        let selection = normalize_selection(&[
            "Name of the youth (CM)",
            "Housing (SQL)",
            "ID Docs",
            "Treatment History (mental health, physical health, substance use) (Excel)",
            "Medi-Cal ID Number (CM)",
            "Shoe Size (Excel)",
        ]);
        assert_eq!(
            selection,
            vec![
                "Name of the youth",
                "Housing",
                "Identification documents",
                "Treatment History",
                "Medical ID Number",
                "Shoe Size",
            ]
        );
    }

    #[test]
    fn test_selection_keeps_order_and_duplicates() {
        let selection = normalize_selection(&["Housing", "Name", "housing (SQL)"]);
        assert_eq!(selection, vec!["Housing", "Name of the youth", "Housing"]);
    }

    #[test]
    fn test_selection_normalization_is_idempotent() {
        let once = normalize_selection(&["Income (SQL)", "Court Dates", "Unknown Label"]);
        let twice = normalize_selection(&once);
        assert_eq!(once, twice);
    }
}
