//! # Reentry Harness
//!
//! Multi-source record resolution and merge engine behind reentry care
//! plans.
//!
//! One person's data is spread over a case-manager spreadsheet export, an
//! operational relational database and an analytical warehouse, each
//! with its own column naming. The harness finds the person in all
//! three, maps every column onto one canonical schema and merges the rows
//! under a fixed source precedence.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐  ┌────────────┐  ┌───────────┐
//! │ Spreadsheet │  │ Relational │  │ Warehouse │
//! │ xlsx / json │  │ MySQL/SQLite│ │ BigQuery  │
//! └──────┬──────┘  └─────┬──────┘  └─────┬─────┘
//!        └───────────────┼───────────────┘
//!                        ▼  concurrent fan-out, per-source timeout
//!                 ┌─────────────┐
//!                 │  normalize  │  alias table → canonical fields
//!                 └──────┬──────┘
//!              ┌─────────┴─────────┐
//!              ▼                   ▼
//!       ┌────────────┐      ┌────────────┐
//!       │ candidates │      │   merge    │──▶ care plan rows
//!       └────────────┘      └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! reentry sources
//! reentry candidates "John Doe"
//! reentry merge --id 5952280034
//! reentry serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`fields`] | Canonical fields and the alias table |
//! | [`normalize`] | Record and selection normalization |
//! | [`models`] | Core data types |
//! | [`traits`] | Source adapter trait and registry |
//! | [`connector_spreadsheet`] | Spreadsheet export adapter |
//! | [`connector_sql`] | Relational database adapter |
//! | [`connector_warehouse`] | BigQuery adapter |
//! | [`sources`] | Concurrent fan-out and health checks |
//! | [`candidates`] | Candidate resolution and dedup |
//! | [`merge`] | Record merge and case-notes fallback |
//! | [`care_plan`] | Care plan selection view |
//! | [`assessment`] | Assistant reply to assessment sections |
//! | [`config`] | TOML configuration parsing |
//! | [`server`] | HTTP server |
//! | [`error`] | Error types |

pub mod assessment;
pub mod candidates;
pub mod care_plan;
pub mod config;
pub mod connector_spreadsheet;
pub mod connector_sql;
pub mod connector_warehouse;
pub mod db;
pub mod error;
pub mod fields;
pub mod merge;
pub mod models;
pub mod normalize;
pub mod server;
pub mod sources;
pub mod traits;
