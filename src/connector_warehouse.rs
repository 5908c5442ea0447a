//! Analytical warehouse connector (BigQuery REST API).
//!
//! Runs a synchronous `jobs.query` request against
//! `POST {endpoint}/bigquery/v2/projects/{project}/queries` with named
//! query parameters, and converts the typed result rows into
//! [`RawRecord`]s.
//!
//! # Configuration
//!
//! ```toml
//! [sources.warehouse]
//! project = "genai-poc-424806"
//! dataset = "SerranoAdvisorsBQ"
//! table = "scalablefeaturesforBQ"
//! token_env = "WAREHOUSE_ACCESS_TOKEN"
//! # endpoint_url = "http://localhost:9050"   # emulator
//! ```
//!
//! # Authentication
//!
//! The OAuth access token is read from the environment variable named by
//! `token_env` and sent as a bearer token. Minting the token (service
//! account, workload identity) is left to the deployment.
//!
//! # Cell conversion
//!
//! | Schema type | JSON value |
//! |-------------|-----------|
//! | `INTEGER`, `INT64` | number |
//! | `FLOAT`, `FLOAT64`, `NUMERIC`, `BIGNUMERIC` | number |
//! | `BOOLEAN`, `BOOL` | bool |
//! | anything else | string as returned |

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::config::{is_sql_identifier, WarehouseSourceConfig};
use crate::error::{Error, Result};
use crate::models::{QueryFilter, RawRecord, SourceKind, SourceQuery};
use crate::traits::RecordSource;

const DEFAULT_ENDPOINT: &str = "https://bigquery.googleapis.com";
const QUERY_TIMEOUT_MS: u64 = 10_000;

/// A warehouse adapter implementing [`RecordSource`].
pub struct WarehouseSource {
    config: WarehouseSourceConfig,
    client: OnceCell<reqwest::Client>,
}

impl WarehouseSource {
    pub fn new(config: WarehouseSourceConfig) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    /// HTTP client, built on first use.
    async fn client(&self) -> Result<&reqwest::Client> {
        self.client
            .get_or_try_init(|| async {
                reqwest::Client::builder()
                    .timeout(Duration::from_millis(QUERY_TIMEOUT_MS * 2))
                    .build()
                    .map_err(Error::from)
            })
            .await
    }

    fn endpoint(&self) -> String {
        let base = self
            .config
            .endpoint_url
            .as_deref()
            .unwrap_or(DEFAULT_ENDPOINT)
            .trim_end_matches('/');
        format!(
            "{}/bigquery/v2/projects/{}/queries",
            base, self.config.project
        )
    }

    fn token(&self) -> Result<String> {
        std::env::var(&self.config.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                Error::Config(format!(
                    "warehouse source needs an access token in {}",
                    self.config.token_env
                ))
            })
    }

    fn table_ref(&self) -> Result<String> {
        for name in [&self.config.dataset, &self.config.table] {
            if !is_sql_identifier(name) {
                return Err(Error::InvalidInput(format!(
                    "warehouse table reference is not a plain identifier: '{}'",
                    name
                )));
            }
        }
        Ok(format!(
            "`{}.{}.{}`",
            self.config.project, self.config.dataset, self.config.table
        ))
    }

    /// Builds the `jobs.query` request body for a filter.
    pub fn request_body(&self, filter: &QueryFilter<'_>) -> Result<Value> {
        let table = self.table_ref()?;
        let (sql, param, value) = match filter {
            QueryFilter::Identifier(id) => (
                format!(
                    "SELECT * FROM {} WHERE TRIM(CAST({} AS STRING)) = @identifier",
                    table,
                    self.checked_column(&self.config.identifier_column)?
                ),
                "identifier",
                *id,
            ),
            QueryFilter::Name(name) => (
                format!(
                    "SELECT * FROM {} WHERE LOWER(TRIM({})) = LOWER(@name)",
                    table,
                    self.checked_column(&self.config.name_column)?
                ),
                "name",
                *name,
            ),
        };

        let mut body = json!({
            "query": sql,
            "useLegacySql": false,
            "parameterMode": "NAMED",
            "timeoutMs": QUERY_TIMEOUT_MS,
            "queryParameters": [{
                "name": param,
                "parameterType": { "type": "STRING" },
                "parameterValue": { "value": value }
            }]
        });
        if let Some(location) = &self.config.location {
            body["location"] = json!(location);
        }
        Ok(body)
    }

    fn checked_column<'a>(&self, column: &'a str) -> Result<&'a str> {
        if is_sql_identifier(column) {
            Ok(column)
        } else {
            Err(Error::InvalidInput(format!(
                "warehouse column is not a plain identifier: '{}'",
                column
            )))
        }
    }

    async fn run(&self, body: &Value) -> Result<QueryResponse> {
        let token = self.token()?;
        let response = self
            .client()
            .await?
            .post(self.endpoint())
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::AdapterUnavailable {
                kind: SourceKind::Warehouse,
                reason: format!("warehouse returned {}: {}", status, text.trim()),
            });
        }

        let parsed: QueryResponse = response.json().await?;
        if parsed.job_complete == Some(false) {
            return Err(Error::AdapterUnavailable {
                kind: SourceKind::Warehouse,
                reason: "query job did not complete in time".to_string(),
            });
        }
        if parsed.is_truncated() {
            debug!(
                returned = parsed.rows.len(),
                total = parsed.total_rows.as_deref().unwrap_or("?"),
                "warehouse result has further pages, using the first"
            );
        }
        Ok(parsed)
    }
}

#[async_trait]
impl RecordSource for WarehouseSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Warehouse
    }

    fn description(&self) -> &str {
        "Analytical warehouse snapshot (BigQuery)"
    }

    async fn fetch(&self, query: &SourceQuery) -> Result<Vec<RawRecord>> {
        let filter = query
            .filter()
            .ok_or_else(|| Error::InvalidInput("query needs a name or identifier".to_string()))?;
        let body = self.request_body(&filter)?;
        let response = self.run(&body).await?;
        Ok(response.into_records())
    }

    async fn health_check(&self) -> Result<String> {
        let body = json!({
            "query": format!("SELECT COUNT(*) AS n FROM {}", self.table_ref()?),
            "useLegacySql": false,
            "timeoutMs": QUERY_TIMEOUT_MS,
        });
        let response = self.run(&body).await?;
        let count = response
            .into_records()
            .first()
            .and_then(|r| r.get("n").cloned())
            .unwrap_or(Value::Null);
        Ok(format!(
            "{}.{}.{} ({} rows)",
            self.config.project, self.config.dataset, self.config.table, count
        ))
    }
}

/// Subset of the `jobs.query` response this adapter reads.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    job_complete: Option<bool>,
    #[serde(default)]
    schema: Option<TableSchema>,
    #[serde(default)]
    rows: Vec<TableRow>,
    #[serde(default)]
    total_rows: Option<String>,
    #[serde(default)]
    page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TableSchema {
    #[serde(default)]
    fields: Vec<FieldSchema>,
}

#[derive(Debug, Deserialize)]
struct FieldSchema {
    name: String,
    #[serde(rename = "type", default)]
    field_type: String,
}

#[derive(Debug, Deserialize)]
struct TableRow {
    #[serde(default)]
    f: Vec<TableCell>,
}

#[derive(Debug, Deserialize)]
struct TableCell {
    #[serde(default)]
    v: Value,
}

impl QueryResponse {
    /// Further rows are only reachable through `getQueryResults` paging.
    fn is_truncated(&self) -> bool {
        self.page_token.is_some()
    }

    fn into_records(self) -> Vec<RawRecord> {
        let fields = self.schema.map(|s| s.fields).unwrap_or_default();
        self.rows
            .into_iter()
            .map(|row| {
                fields
                    .iter()
                    .zip(row.f)
                    .map(|(field, cell)| (field.name.clone(), typed_cell(&field.field_type, cell.v)))
                    .collect()
            })
            .collect()
    }
}

fn typed_cell(field_type: &str, raw: Value) -> Value {
    let text = match raw {
        Value::String(text) => text,
        other => return other,
    };
    match field_type.to_ascii_uppercase().as_str() {
        "INTEGER" | "INT64" => text
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or(Value::String(text)),
        "FLOAT" | "FLOAT64" | "NUMERIC" | "BIGNUMERIC" => text
            .parse::<f64>()
            .map(Value::from)
            .unwrap_or(Value::String(text)),
        "BOOLEAN" | "BOOL" => match text.to_ascii_lowercase().as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::String(text),
        },
        _ => Value::String(text),
    }
}
