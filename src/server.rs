//! JSON HTTP server.
//!
//! Exposes candidate resolution, merging, care plans and assessments to
//! the case-manager frontend.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/sources` | Configuration and health of each source |
//! | `POST` | `/get_candidates_by_name` | Distinct people matching a name |
//! | `POST` | `/merge` | Merged record for a name or identifier |
//! | `POST` | `/generate_reentry_care_plan` | Care plan rows for a selection |
//! | `POST` | `/assessment` | Sections of an assistant assessment reply |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "candidate_name must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `internal` (500). Source outages are
//! not errors; they appear in the `warnings` array of a 200 response.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the browser
//! frontend can be served from a different origin.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::assessment::{build_assessment, parse_assistant_reply, Assessment};
use crate::candidates::{resolve_candidates, CandidateResolution};
use crate::care_plan::{build_care_plan, CarePlan, SelectionRequest};
use crate::config::Config;
use crate::error::Error;
use crate::merge::merge;
use crate::models::{Identity, MergedRecord, PerSource, SourceQuery, Warning};
use crate::sources::{check_sources, SourceStatus};
use crate::traits::SourceRegistry;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    sources: Arc<SourceRegistry>,
}

/// Starts the server with the sources configured in `[sources]`.
///
/// Binds to `[server].bind` and runs until the process is terminated.
/// No source is contacted until the first request.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    run_server_with_sources(config, SourceRegistry::from_config(config)).await
}

/// Starts the server with a caller-supplied registry.
///
/// Used by embedders with their own [`RecordSource`](crate::traits::RecordSource)
/// implementations, and by tests.
pub async fn run_server_with_sources(
    config: &Config,
    sources: SourceRegistry,
) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = router(Arc::new(config.clone()), Arc::new(sources));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "reentry server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(config: Arc<Config>, sources: Arc<SourceRegistry>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/sources", get(handle_sources))
        .route("/get_candidates_by_name", post(handle_candidates))
        .route("/merge", post(handle_merge))
        .route("/generate_reentry_care_plan", post(handle_care_plan))
        .route("/assessment", post(handle_assessment))
        .layer(cors)
        .with_state(AppState { config, sources })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        if err.is_client_error() {
            AppError {
                status: StatusCode::BAD_REQUEST,
                code: "bad_request".to_string(),
                message: err.to_string(),
            }
        } else {
            error!(error = %err, "request failed");
            AppError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "internal".to_string(),
                message: err.to_string(),
            }
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /sources ============

#[derive(Serialize)]
struct SourcesResponse {
    sources: Vec<SourceStatus>,
}

/// Runs the explicit health check against every source.
async fn handle_sources(State(state): State<AppState>) -> Json<SourcesResponse> {
    Json(SourcesResponse {
        sources: check_sources(&state.sources).await,
    })
}

// ============ POST /get_candidates_by_name ============

#[derive(Deserialize)]
struct CandidatesRequest {
    #[serde(default)]
    candidate_name: String,
}

async fn handle_candidates(
    State(state): State<AppState>,
    Json(req): Json<CandidatesRequest>,
) -> Result<Json<CandidateResolution>, AppError> {
    Ok(Json(
        resolve_candidates(&state.sources, &req.candidate_name).await?,
    ))
}

// ============ POST /merge ============

#[derive(Serialize)]
struct MergeResponse {
    record: MergedRecord,
    per_source: PerSource,
    identity: Option<Identity>,
    warnings: Vec<Warning>,
}

async fn handle_merge(
    State(state): State<AppState>,
    Json(query): Json<SourceQuery>,
) -> Result<Json<MergeResponse>, AppError> {
    let outcome = merge(&state.sources, &query).await?;
    Ok(Json(MergeResponse {
        identity: outcome.identity(),
        record: outcome.record,
        per_source: outcome.per_source,
        warnings: outcome.warnings,
    }))
}

// ============ POST /generate_reentry_care_plan ============

async fn handle_care_plan(
    State(state): State<AppState>,
    Json(req): Json<SelectionRequest>,
) -> Result<Json<CarePlan>, AppError> {
    Ok(Json(
        build_care_plan(&state.sources, &state.config.report, &req).await?,
    ))
}

// ============ POST /assessment ============

/// `reply` is either the assistant's raw text or an already-parsed object.
#[derive(Deserialize)]
struct AssessmentRequest {
    reply: Value,
}

async fn handle_assessment(
    Json(req): Json<AssessmentRequest>,
) -> Result<Json<Assessment>, AppError> {
    let value = match req.reply {
        Value::String(text) => parse_assistant_reply(&text)?,
        other => other,
    };
    Ok(Json(build_assessment(&value)?))
}
