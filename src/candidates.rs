//! Candidate resolution.
//!
//! A name typed into the UI may match several people, possibly spread
//! across sources. [`resolve_candidates`] queries every source by name and
//! returns one [`Identity`] per distinct identifier so the caller can pick
//! the right person before merging.
//!
//! Sources are visited Spreadsheet, Relational, Warehouse; the first
//! identity seen for an identifier wins, so a phone number from the
//! spreadsheet shadows a different one from the database.

use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{Identity, SourceKind, SourceQuery, Warning};
use crate::normalize::normalize_record;
use crate::sources::{fetch_all, FanOut};
use crate::traits::SourceRegistry;

/// Deduplicated identities matching a name, with any source warnings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CandidateResolution {
    pub candidates: Vec<Identity>,
    pub warnings: Vec<Warning>,
}

/// Finds every distinct person whose name matches `display_name`.
///
/// `display_name` may also be a `display_text` from an earlier resolution;
/// the embedded identifier then narrows the lookup to that person.
/// Returns an empty list when nobody matches. A blank name is
/// [`Error::InvalidInput`].
pub async fn resolve_candidates(
    registry: &SourceRegistry,
    display_name: &str,
) -> Result<CandidateResolution> {
    let text = display_name.trim();
    if text.is_empty() {
        return Err(Error::InvalidInput(
            "candidate name must not be empty".to_string(),
        ));
    }

    let query = match Identity::parse_display_text(text) {
        Some((name, identifier)) => SourceQuery {
            name: Some(name),
            identifier: Some(identifier),
        },
        None => SourceQuery::by_name(text),
    };

    let fan_out = fetch_all(registry, &query).await;
    let candidates = dedup_identities(&fan_out);
    debug!(query = text, count = candidates.len(), "resolved candidates");

    Ok(CandidateResolution {
        candidates,
        warnings: fan_out.warnings,
    })
}

fn dedup_identities(fan_out: &FanOut) -> Vec<Identity> {
    let mut seen = HashSet::new();
    let mut identities = Vec::new();

    for kind in SourceKind::DEDUP_ORDER {
        for row in fan_out.rows(kind) {
            let Some(identity) = Identity::from_record(&normalize_record(row.clone())) else {
                continue;
            };
            if seen.insert(identity.identifier.clone()) {
                identities.push(identity);
            }
        }
    }

    identities
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawRecord;
    use crate::traits::RecordSource;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct Rows {
        kind: SourceKind,
        rows: Vec<RawRecord>,
    }

    #[async_trait]
    impl RecordSource for Rows {
        fn kind(&self) -> SourceKind {
            self.kind
        }

        fn description(&self) -> &str {
            "fixed rows"
        }

        async fn fetch(&self, query: &SourceQuery) -> Result<Vec<RawRecord>> {
            let filter = query.filter().expect("query has a filter");
            Ok(self
                .rows
                .iter()
                .filter(|r| filter.matches(&normalize_record((*r).clone())))
                .cloned()
                .collect())
        }
    }

    struct Down(SourceKind);

    #[async_trait]
    impl RecordSource for Down {
        fn kind(&self) -> SourceKind {
            self.0
        }

        fn description(&self) -> &str {
            "always fails"
        }

        async fn fetch(&self, _query: &SourceQuery) -> Result<Vec<RawRecord>> {
            Err(Error::AdapterUnavailable {
                kind: self.0,
                reason: "connection refused".to_string(),
            })
        }
    }

    fn row(pairs: &[(&str, Value)]) -> RawRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_first_seen_identity_wins() {
        let mut registry = SourceRegistry::new();
        registry.register(Box::new(Rows {
            kind: SourceKind::Spreadsheet,
            rows: vec![row(&[
                ("Name of the youth", json!("John Doe")),
                ("Medical ID Number", json!(5952280034.0)),
                ("Phone Number", json!("111")),
            ])],
        }));
        registry.register(Box::new(Rows {
            kind: SourceKind::Warehouse,
            rows: vec![row(&[
                ("youth_name", json!("John Doe")),
                ("medical_id_number", json!("5952280034")),
                ("telephone", json!("222")),
            ])],
        }));

        let resolution = resolve_candidates(&registry, "John Doe").await.unwrap();
        assert_eq!(resolution.candidates.len(), 1);
        assert_eq!(resolution.candidates[0].identifier, "5952280034");
        assert_eq!(resolution.candidates[0].phone, "111");
    }

    #[tokio::test]
    async fn test_distinct_people_with_same_name() {
        let mut registry = SourceRegistry::new();
        registry.register(Box::new(Rows {
            kind: SourceKind::Relational,
            rows: vec![
                row(&[
                    ("youth_name", json!("John Doe")),
                    ("medical_id_number", json!("111")),
                ]),
                row(&[
                    ("youth_name", json!("john doe")),
                    ("medical_id_number", json!("222")),
                ]),
                row(&[("youth_name", json!("John Doe"))]),
            ],
        }));

        let resolution = resolve_candidates(&registry, "John Doe").await.unwrap();
        let ids: Vec<&str> = resolution
            .candidates
            .iter()
            .map(|c| c.identifier.as_str())
            .collect();
        assert_eq!(ids, vec!["111", "222"]);
    }

    #[tokio::test]
    async fn test_no_match_is_empty() {
        let mut registry = SourceRegistry::new();
        registry.register(Box::new(Rows {
            kind: SourceKind::Spreadsheet,
            rows: vec![row(&[
                ("Name of the youth", json!("Jane Smith")),
                ("Medical ID Number", json!("1")),
            ])],
        }));

        let resolution = resolve_candidates(&registry, "Nonexistent Person")
            .await
            .unwrap();
        assert!(resolution.candidates.is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_source_still_resolves_others() {
        let mut registry = SourceRegistry::new();
        registry.register(Box::new(Down(SourceKind::Relational)));
        registry.register(Box::new(Rows {
            kind: SourceKind::Warehouse,
            rows: vec![row(&[
                ("youth_name", json!("John Doe")),
                ("medical_id_number", json!(42)),
            ])],
        }));

        let resolution = resolve_candidates(&registry, "John Doe").await.unwrap();
        assert_eq!(resolution.candidates.len(), 1);
        assert!(resolution.warnings.iter().any(|w| matches!(
            w,
            Warning::SourceUnavailable { source: SourceKind::Relational, .. }
        )));
    }

    #[tokio::test]
    async fn test_display_text_resolves_same_person() {
        let mut registry = SourceRegistry::new();
        registry.register(Box::new(Rows {
            kind: SourceKind::Relational,
            rows: vec![
                row(&[
                    ("youth_name", json!("John Doe")),
                    ("medical_id_number", json!("5952280034")),
                ]),
                row(&[
                    ("youth_name", json!("John Doe")),
                    ("medical_id_number", json!("777")),
                ]),
            ],
        }));

        let first = resolve_candidates(&registry, "John Doe").await.unwrap();
        assert_eq!(first.candidates.len(), 2);
        let chosen = &first.candidates[0];
        assert_eq!(
            chosen.display_text,
            "John Doe (ID: 5952280034, Phone: N/A, Address: N/A)"
        );

        let again = resolve_candidates(&registry, &chosen.display_text)
            .await
            .unwrap();
        assert_eq!(again.candidates, vec![chosen.clone()]);
    }

    #[tokio::test]
    async fn test_blank_name_is_invalid() {
        let registry = SourceRegistry::new();
        let err = resolve_candidates(&registry, "   ").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
