//! Command-line interface for catalog-sync
//!
//! # Usage Examples
//!
//! ## Upsert
//! ```bash
//! # Products from JSONL into the in-memory store (prints ids and rewritten rows)
//! catalog-sync upsert products --input products.jsonl
//!
//! # Categories into table files under ./data, with dev diagnostics
//! catalog-sync upsert categories \
//!   --input categories.json \
//!   --store filesystem --store-dir ./data \
//!   --dev
//!
//! # Skip products whose is_active is false
//! catalog-sync upsert products --input products.jsonl --exclude-inactive
//!
//! # Preview ids against the table files without changing them
//! catalog-sync upsert products --input products.jsonl \
//!   --store filesystem --store-dir ./data --dry-run
//! ```
//!
//! ## Dedupe preview
//! ```bash
//! catalog-sync dedupe --input products.jsonl --ignore price,name --exclude is_active=false
//! ```
//!
//! Logging is controlled with `RUST_LOG`, e.g. `RUST_LOG=debug`. Without it the
//! level is `warn`, or `info` under `--dev`.

use anyhow::Context;
use app_error::ApiResponse;
use catalog::UpsertOptions;
use catalog_sync::{dedupe_values, input, parse_exclusion, upsert_file, CatalogTable, StoreOpts};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use sync_core::{ignored_fields, Deduplicated};
use upsert_sink::{Diagnostics, FilesystemStore, MemoryStore, StoreKind, UpsertSink};

#[derive(Parser)]
#[command(name = "catalog-sync")]
#[command(about = "Deduplicated bulk upserts for catalog rows")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upsert a batch file into a catalog table
    Upsert {
        /// Row type of the batch
        #[arg(value_enum)]
        table: CatalogTable,

        /// Batch file (.json array or JSONL)
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        /// Skip rows whose is_active is false
        #[arg(long)]
        exclude_inactive: bool,

        /// Store options
        #[command(flatten)]
        store_opts: StoreOpts,
    },

    /// Show how a batch collapses, without writing
    Dedupe {
        /// Batch file (.json array or JSONL)
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        /// Fields that do not keep two records apart
        #[arg(long, value_delimiter = ',')]
        ignore: Vec<String>,

        /// Exclude records where field equals value (format: field=value)
        #[arg(long = "exclude", value_name = "RULE")]
        exclusions: Vec<String>,
    },
}

#[derive(serde::Serialize)]
struct DedupePreview<'a> {
    unique: usize,
    excluded: usize,
    #[serde(flatten)]
    deduped: &'a Deduplicated,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; RUST_LOG wins, --dev lowers the default to info
    let dev = matches!(&cli.command, Commands::Upsert { store_opts, .. } if store_opts.dev);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(if dev { "info" } else { "warn" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Upsert {
            table,
            input,
            exclude_inactive,
            store_opts,
        } => {
            let options = UpsertOptions {
                exclude_inactive,
                diagnostics: Diagnostics::new(store_opts.dev),
            };

            if store_opts.dry_run {
                tracing::info!(
                    "Dry run: writing {} to a scratch copy of the {} store",
                    table.table_name(),
                    store_opts.store
                );
                let scratch = store_opts.dry_run_store(table)?;
                return run_upsert(&scratch, table, &input, &options, store_opts.dev).await;
            }

            match store_opts.store {
                StoreKind::Memory => {
                    run_upsert(&MemoryStore::new(), table, &input, &options, store_opts.dev).await
                }
                StoreKind::Filesystem => {
                    let store = FilesystemStore::new(&store_opts.store_dir);
                    run_upsert(&store, table, &input, &options, store_opts.dev).await
                }
            }
        }
        Commands::Dedupe {
            input,
            ignore,
            exclusions,
        } => {
            let exclusions = exclusions
                .iter()
                .map(|rule| parse_exclusion(rule))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let values = input::read_values(&input)?;
            let deduped = dedupe_values(values, &ignored_fields(ignore), &exclusions)?;
            let preview = DedupePreview {
                unique: deduped.items.len(),
                excluded: deduped.positions.excluded(),
                deduped: &deduped,
            };
            println!("{}", serde_json::to_string_pretty(&preview)?);
            Ok(())
        }
    }
}

async fn run_upsert<S: UpsertSink>(
    sink: &S,
    table: CatalogTable,
    input: &Path,
    options: &UpsertOptions,
    dev: bool,
) -> anyhow::Result<()> {
    match upsert_file(sink, table, input, options).await {
        Ok(report) => {
            let response = ApiResponse::ok(report);
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Err(err) => {
            let response: ApiResponse<()> = ApiResponse::from_error(&err, dev);
            println!(
                "{}",
                serde_json::to_string_pretty(&response).context("Failed to render error response")?
            );
            Err(err.into())
        }
    }
}
