//! Source fan-out and health status.
//!
//! [`fetch_all`] issues one fetch per source concurrently, each bounded by
//! the registry timeout, and collects the results in merge order. Any
//! failure is folded into a [`Warning`] so one bad source never sinks the
//! whole operation. Dropping the returned future cancels all in-flight
//! fetches.
//!
//! [`check_sources`] is the explicit health check used by `reentry
//! sources` and `GET /sources`. Nothing here runs at load time.

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Error;
use crate::models::{RawRecord, SourceKind, SourceQuery, Warning};
use crate::traits::SourceRegistry;

/// Rows one source returned for a query.
#[derive(Debug, Clone)]
pub struct SourceRows {
    pub kind: SourceKind,
    pub rows: Vec<RawRecord>,
}

/// Everything the fan-out produced, in [`SourceKind::MERGE_ORDER`].
#[derive(Debug, Clone, Default)]
pub struct FanOut {
    pub results: Vec<SourceRows>,
    pub warnings: Vec<Warning>,
}

impl FanOut {
    /// Rows from `kind`, empty when the source failed or is missing.
    pub fn rows(&self, kind: SourceKind) -> &[RawRecord] {
        self.results
            .iter()
            .find(|r| r.kind == kind)
            .map(|r| r.rows.as_slice())
            .unwrap_or(&[])
    }
}

/// Query every source concurrently.
///
/// Sequential execution would yield the same [`FanOut`]: results are
/// placed by source kind, not by completion order.
pub async fn fetch_all(registry: &SourceRegistry, query: &SourceQuery) -> FanOut {
    let (spreadsheet, relational, warehouse) = tokio::join!(
        fetch_one(registry, SourceKind::Spreadsheet, query),
        fetch_one(registry, SourceKind::Relational, query),
        fetch_one(registry, SourceKind::Warehouse, query),
    );

    let mut fan_out = FanOut::default();
    for (kind, outcome) in [
        (SourceKind::Spreadsheet, spreadsheet),
        (SourceKind::Relational, relational),
        (SourceKind::Warehouse, warehouse),
    ] {
        match outcome {
            Ok(rows) => fan_out.results.push(SourceRows { kind, rows }),
            Err(warning) => {
                if warning.is_outage() {
                    warn!(source = %kind, "{}", warning);
                } else {
                    debug!(source = %kind, "{}", warning);
                }
                fan_out.warnings.push(warning);
            }
        }
    }
    fan_out
}

async fn fetch_one(
    registry: &SourceRegistry,
    kind: SourceKind,
    query: &SourceQuery,
) -> Result<Vec<RawRecord>, Warning> {
    let source = registry
        .get(kind)
        .ok_or(Warning::SourceNotConfigured { source: kind })?;

    let outcome = match tokio::time::timeout(registry.timeout(), source.fetch(query)).await {
        Ok(result) => result,
        Err(_) => Err(Error::AdapterUnavailable {
            kind,
            reason: format!("timed out after {}ms", registry.timeout().as_millis()),
        }),
    };

    outcome.map_err(|err| unavailable(kind, err))
}

fn unavailable(kind: SourceKind, err: Error) -> Warning {
    let reason = match err {
        Error::AdapterUnavailable { reason, .. } => reason,
        other => other.to_string(),
    };
    Warning::SourceUnavailable {
        source: kind,
        reason,
    }
}

/// Health and configuration status of a single source.
#[derive(Debug, Clone, Serialize)]
pub struct SourceStatus {
    pub name: SourceKind,
    pub configured: bool,
    pub healthy: bool,
    pub notes: Option<String>,
}

/// Probe every source. Each probe gets the registry timeout.
pub async fn check_sources(registry: &SourceRegistry) -> Vec<SourceStatus> {
    let mut statuses = Vec::with_capacity(SourceKind::MERGE_ORDER.len());

    for kind in SourceKind::MERGE_ORDER {
        let Some(source) = registry.get(kind) else {
            statuses.push(SourceStatus {
                name: kind,
                configured: false,
                healthy: false,
                notes: None,
            });
            continue;
        };

        let status = match tokio::time::timeout(registry.timeout(), source.health_check()).await {
            Ok(Ok(notes)) => SourceStatus {
                name: kind,
                configured: true,
                healthy: true,
                notes: Some(notes),
            },
            Ok(Err(e)) => SourceStatus {
                name: kind,
                configured: true,
                healthy: false,
                notes: Some(e.to_string()),
            },
            Err(_) => SourceStatus {
                name: kind,
                configured: true,
                healthy: false,
                notes: Some("health check timed out".to_string()),
            },
        };
        statuses.push(status);
    }

    statuses
}
