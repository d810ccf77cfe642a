//! # openFDA Harvest CLI (`ofda`)
//!
//! The `ofda` binary drives the harvester: it turns a query against one
//! openFDA database into a single JSON document of result records, or into
//! a term-frequency table for a field.
//!
//! ## Usage
//!
//! ```bash
//! ofda [--config ./ofda.toml] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ofda harvest "<query>"` | Paginate through all matching records and write one JSON document |
//! | `ofda count "<query>" <field>` | Count matching records grouped by a field |
//!
//! ## Examples
//!
//! ```bash
//! # Harvest adverse event reports, de-duplicated by report number
//! ofda harvest "In2Bones" --database event --identity-field report_number
//!
//! # Abort instead of returning a partial result
//! ofda harvest "device_name:pacemaker" --strict
//!
//! # Pipe records to stdout instead of the date-named default file
//! ofda harvest "In2Bones" --out -
//!
//! # Frequency of event types for a manufacturer
//! ofda count "manufacturer_name:acme" event_type --database event
//! ```
//!
//! Pressing Ctrl-C cancels an in-flight harvest; completed pages are kept
//! and the remaining offsets are marked `cancelled` in the ledger.

mod aggregator;
mod config;
mod counts;
mod error;
mod export;
mod fetcher;
mod harvest;
mod models;
mod pager;
mod progress;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::harvest::Harvester;
use crate::models::Query;
use crate::progress::ProgressMode;

/// openFDA Harvest: paginate a query against the openFDA device API
/// family into one complete, de-duplicated JSON document.
#[derive(Parser)]
#[command(
    name = "ofda",
    about = "Harvest paginated openFDA query results into a single JSON document",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). All settings have defaults, so
    /// this is optional; see the repository's example config.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Progress output on stderr: auto (TTY-dependent), off, human, json.
    #[arg(long, global = true, default_value = "auto")]
    progress: String,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Harvest all records matching a query into one JSON document.
    ///
    /// Runs the metadata probe, fetches every page with bounded
    /// concurrency, merges in offset order, and writes the records as a
    /// JSON array. By default the output file is named
    /// `{last_updated}_FDA_JSON_{database}.json`.
    Harvest {
        /// Opaque search expression, passed through to `search=`.
        query: String,

        /// Database path segment: event, udi, recall, 510k, enforcement,
        /// registrationlisting, classification, ...
        #[arg(long, default_value = "event")]
        database: String,

        /// Record field treated as a unique identity; records repeated
        /// across page boundaries are dropped.
        #[arg(long)]
        identity_field: Option<String>,

        /// Stop after this many records.
        #[arg(long)]
        max_records: Option<u64>,

        /// Records per page (overrides config).
        #[arg(long)]
        page_size: Option<usize>,

        /// Abort on the first failed page instead of returning a partial
        /// result.
        #[arg(long)]
        strict: bool,

        /// Output file path; `-` writes to stdout. Defaults to the
        /// date-named file in the current directory.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Endpoint family root (overrides config).
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Count matching records grouped by a field.
    ///
    /// Issues a single `count=` query and prints the frequency table as
    /// JSON on stdout.
    Count {
        /// Opaque search expression, passed through to `search=`.
        query: String,

        /// Field to aggregate on (e.g. `event_type`, `date_received`).
        field: String,

        /// Database path segment.
        #[arg(long, default_value = "event")]
        database: String,

        /// Endpoint family root (overrides config).
        #[arg(long)]
        base_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => Config::default(),
    };

    let progress_mode = parse_progress_mode(&cli.progress)?;

    match cli.command {
        Commands::Harvest {
            query,
            database,
            identity_field,
            max_records,
            page_size,
            strict,
            out,
            base_url,
        } => {
            if let Some(url) = base_url {
                config.api.base_url = url;
            }
            if let Some(size) = page_size {
                config.harvest.page_size = size;
            }
            config::validate(&config)?;

            let mut query = Query::new(query, database, config.harvest.page_size);
            if let Some(field) = identity_field {
                query = query.with_identity_field(field);
            }
            if let Some(cap) = max_records {
                query = query.with_max_records(cap);
            }
            if strict {
                query = query.strict();
            }

            run_harvest(&config, &query, out, progress_mode).await
        }
        Commands::Count {
            query,
            field,
            database,
            base_url,
        } => {
            if let Some(url) = base_url {
                config.api.base_url = url;
            }
            config::validate(&config)?;

            let harvester = Harvester::new(&config)?;
            let query = Query::new(query, database, config.harvest.page_size);
            let rows = harvester.fetcher().count_terms(&query, &field).await?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
            Ok(())
        }
    }
}

async fn run_harvest(
    config: &Config,
    query: &Query,
    out: Option<PathBuf>,
    progress_mode: ProgressMode,
) -> Result<()> {
    let harvester = Harvester::new(config)?;

    // Ctrl-C cancels the harvest; completed pages are still merged.
    let cancel_token = CancellationToken::new();
    let signal_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Cancelling harvest...");
            signal_token.cancel();
        }
    });

    let reporter = progress_mode.reporter();
    let result = harvester
        .run_cancellable(query, cancel_token, reporter.as_ref())
        .await
        .with_context(|| format!("harvest of '{}' failed", query.database))?;

    let output = match out {
        Some(path) if path.as_os_str() == "-" => None,
        Some(path) => Some(path),
        None => Some(PathBuf::from(export::default_file_name(
            &result,
            &query.database,
        ))),
    };

    export::write_records(&result, output.as_deref())
}

fn parse_progress_mode(raw: &str) -> Result<ProgressMode> {
    match raw {
        "auto" => Ok(ProgressMode::default_for_tty()),
        "off" => Ok(ProgressMode::Off),
        "human" => Ok(ProgressMode::Human),
        "json" => Ok(ProgressMode::Json),
        other => anyhow::bail!("Unknown progress mode: '{}'. Use auto, off, human, or json.", other),
    }
}
