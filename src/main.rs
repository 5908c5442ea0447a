//! # Reentry Harness CLI (`reentry`)
//!
//! Command-line front end for the multi-source resolution and merge
//! engine. Every command prints pretty JSON to stdout; logs go to stderr.
//!
//! ## Usage
//!
//! ```bash
//! reentry --config ./config/reentry.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `reentry sources` | Configuration and health of each source |
//! | `reentry candidates "<name>"` | Distinct people matching a name |
//! | `reentry merge --name/--id` | Merged record for one person |
//! | `reentry plan "<candidate>" --field <label>...` | Care plan rows |
//! | `reentry assess <file>` | Assessment sections from an assistant reply |
//! | `reentry serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! reentry candidates "John Doe"
//! reentry plan "John Doe (ID: 5952280034, Phone: 111, Address: N/A)" \
//!     --field "Housing (Excel)" --field Employment
//! RUST_LOG=reentry_harness=debug reentry merge --id 5952280034
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reentry_harness::assessment::{build_assessment, parse_assistant_reply};
use reentry_harness::candidates::resolve_candidates;
use reentry_harness::care_plan::{build_care_plan, SelectionRequest};
use reentry_harness::config::load_config;
use reentry_harness::merge::merge;
use reentry_harness::models::SourceQuery;
use reentry_harness::server::run_server;
use reentry_harness::sources::check_sources;
use reentry_harness::traits::SourceRegistry;

/// Reentry Harness: resolve, merge and render one person's records from
/// the spreadsheet export, the relational database and the warehouse.
#[derive(Parser)]
#[command(name = "reentry", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/reentry.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe every configured source.
    Sources,

    /// List the distinct people whose name matches.
    Candidates {
        /// Full name, matched trimmed and case-insensitively.
        name: String,
    },

    /// Merge one person's records across all sources.
    ///
    /// When both are given the identifier is used.
    Merge {
        #[arg(long)]
        name: Option<String>,

        /// Medical ID number.
        #[arg(long = "id")]
        identifier: Option<String>,
    },

    /// Build care plan rows for a candidate.
    Plan {
        /// Plain name or a candidate `display_text`.
        candidate: String,

        /// Field label to include; repeat for several. UI suffixes such
        /// as " (CM)" are accepted.
        #[arg(long = "field", required = true)]
        fields: Vec<String>,
    },

    /// Turn an assistant reply (free text holding a JSON object) into
    /// assessment sections. Does not need a config file.
    Assess {
        /// File holding the reply.
        file: PathBuf,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reentry_harness=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Commands that don't require config
    if let Commands::Assess { file } = &cli.command {
        let text = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read reply file: {}", file.display()))?;
        let reply = parse_assistant_reply(&text)?;
        return print_json(&build_assessment(&reply)?);
    }

    let cfg = load_config(&cli.config)?;
    let registry = SourceRegistry::from_config(&cfg);

    match cli.command {
        Commands::Sources => {
            print_json(&check_sources(&registry).await)?;
        }
        Commands::Candidates { name } => {
            print_json(&resolve_candidates(&registry, &name).await?)?;
        }
        Commands::Merge { name, identifier } => {
            let outcome = merge(&registry, &SourceQuery { name, identifier }).await?;
            print_json(&outcome)?;
        }
        Commands::Plan { candidate, fields } => {
            let request = SelectionRequest {
                selected_fields: fields,
                candidate_name: candidate,
            };
            print_json(&build_care_plan(&registry, &cfg.report, &request).await?)?;
        }
        Commands::Serve => {
            run_server(&cfg).await?;
        }
        Commands::Assess { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
