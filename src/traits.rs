//! Source adapter trait and registry.
//!
//! Each backing store is reached through a [`RecordSource`]. The
//! [`SourceRegistry`] holds at most one adapter per [`SourceKind`] and the
//! per-call timeout the fan-out applies to every fetch.
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │               SourceRegistry               │
//! │  ┌─────────────┐ ┌──────────┐ ┌─────────┐  │
//! │  │ Spreadsheet │ │Relational│ │Warehouse│  │
//! │  │ xlsx / json │ │ SQL pool │ │  REST   │  │
//! │  └─────────────┘ └──────────┘ └─────────┘  │
//! └──────────────────┬─────────────────────────┘
//!                    ▼
//!     resolve_candidates() / merge() fan-out
//! ```
//!
//! # Usage
//!
//! ```rust
//! use reentry_harness::traits::SourceRegistry;
//!
//! let mut sources = SourceRegistry::new();
//! // sources.register(Box::new(MySource::new()));
//! assert!(sources.is_empty());
//! ```

use async_trait::async_trait;
use std::time::Duration;

use crate::config::Config;
use crate::error::Result;
use crate::models::{RawRecord, SourceKind, SourceQuery};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A backing store that can look up rows for one person.
///
/// # Contract
///
/// - When both `name` and `identifier` are set, filter on the identifier.
/// - Reachable store, no matching rows: `Ok(vec![])`, never an error.
/// - Unreachable store, bad credentials, malformed query: `Err(_)`. The
///   fan-out records this as a warning and carries on with the other
///   sources.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use reentry_harness::error::Result;
/// use reentry_harness::models::{RawRecord, SourceKind, SourceQuery};
/// use reentry_harness::traits::RecordSource;
///
/// pub struct FixedRows(Vec<RawRecord>);
///
/// #[async_trait]
/// impl RecordSource for FixedRows {
///     fn kind(&self) -> SourceKind { SourceKind::Spreadsheet }
///     fn description(&self) -> &str { "Fixed rows" }
///
///     async fn fetch(&self, _query: &SourceQuery) -> Result<Vec<RawRecord>> {
///         Ok(self.0.clone())
///     }
/// }
/// ```
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Which slot of the precedence order this adapter fills.
    fn kind(&self) -> SourceKind;

    /// One-line description for `reentry sources`.
    fn description(&self) -> &str;

    /// Fetch zero or more rows matching the query.
    ///
    /// May perform network or database I/O and may block; the caller
    /// bounds it with a timeout.
    async fn fetch(&self, query: &SourceQuery) -> Result<Vec<RawRecord>>;

    /// Probe the backing store. Only ever called on demand.
    ///
    /// Returns a short diagnostic note on success.
    async fn health_check(&self) -> Result<String> {
        Ok("configured".to_string())
    }
}

/// Registry holding one adapter per source kind.
pub struct SourceRegistry {
    sources: Vec<Box<dyn RecordSource>>,
    timeout: Duration,
}

impl SourceRegistry {
    /// Create an empty registry with the default timeout.
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create a registry pre-loaded with every adapter configured in
    /// `[sources]`. No connection is opened here.
    pub fn from_config(config: &Config) -> Self {
        use crate::connector_spreadsheet::SpreadsheetSource;
        use crate::connector_sql::SqlSource;
        use crate::connector_warehouse::WarehouseSource;

        let mut registry =
            Self::new().with_timeout(Duration::from_secs(config.sources.timeout_secs));

        if let Some(cfg) = &config.sources.spreadsheet {
            registry.register(Box::new(SpreadsheetSource::new(cfg.clone())));
        }
        if let Some(cfg) = &config.sources.relational {
            registry.register(Box::new(SqlSource::new(cfg.clone())));
        }
        if let Some(cfg) = &config.sources.warehouse {
            registry.register(Box::new(WarehouseSource::new(cfg.clone())));
        }

        registry
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Per-fetch deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Register an adapter, replacing any existing one of the same kind.
    pub fn register(&mut self, source: Box<dyn RecordSource>) {
        let kind = source.kind();
        self.sources.retain(|s| s.kind() != kind);
        self.sources.push(source);
    }

    /// The adapter registered for `kind`, if any.
    pub fn get(&self, kind: SourceKind) -> Option<&dyn RecordSource> {
        self.sources
            .iter()
            .find(|s| s.kind() == kind)
            .map(|s| s.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
