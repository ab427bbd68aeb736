//! catalog-sync library
//!
//! Bulk upserts for catalog rows (products, categories, order items) with
//! duplicate collapsing and placeholder id resolution.
//!
//! # Crates
//!
//! - `sync_core` - deduplication and identifier reconciliation
//! - `upsert_sink` - the `UpsertSink` boundary, the bulk pipeline and stores
//! - `app_error` - layered error frames
//! - `catalog` - row types, DAL and service layers
//!
//! This crate is the request-handler layer: it reads batch files, picks the
//! row type, calls the service, and records `ENDPOINT` frames.
//!
//! # CLI Usage
//!
//! ```bash
//! # Upsert products into the filesystem store
//! catalog-sync upsert products --input products.jsonl --store filesystem --store-dir ./data
//!
//! # Show how a batch would collapse
//! catalog-sync dedupe --input products.jsonl --ignore price,name
//! ```

use anyhow::{anyhow, Result};
use app_error::{AppError, ErrorFrame, ErrorKind, Layer};
use catalog::service;
use catalog::{CatalogRow, Category, OrderItem, Product, UpsertOptions};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use sync_core::{deduplicate, BatchItem, Deduplicated, IgnoredFields, ResolvedId};
use upsert_sink::{FilesystemStore, MemoryStore, StoreKind, UpsertSink};

pub mod input;

#[derive(Parser, Clone, Debug)]
pub struct StoreOpts {
    /// Store backend: memory or filesystem
    #[arg(long, default_value = "memory", env = "CATALOG_SYNC_STORE")]
    pub store: StoreKind,

    /// Directory holding table files for the filesystem store
    #[arg(long, default_value = ".catalog-sync", env = "CATALOG_SYNC_STORE_DIR")]
    pub store_dir: PathBuf,

    /// Log deduplication details and include error frames in output
    #[arg(long, env = "CATALOG_SYNC_DEV")]
    pub dev: bool,

    /// Dry run mode - upsert into an in-memory copy of the selected store's
    /// table and leave the store untouched
    #[arg(long)]
    pub dry_run: bool,
}

impl StoreOpts {
    /// Scratch store for a dry run against `table`.
    ///
    /// The filesystem store's current table is copied in so previewed ids
    /// match what a real run would assign. The memory store starts empty on
    /// every run, so its scratch copy does too.
    pub fn dry_run_store(&self, table: CatalogTable) -> Result<MemoryStore> {
        let scratch = MemoryStore::new();
        match self.store {
            StoreKind::Memory => Ok(scratch),
            StoreKind::Filesystem => {
                let state = FilesystemStore::new(&self.store_dir).read_table(table.table_name())?;
                Ok(scratch.with_table(table.table_name(), state))
            }
        }
    }
}

/// Row type selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CatalogTable {
    Products,
    Categories,
    OrderItems,
}

impl CatalogTable {
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::Products => Product::TABLE,
            Self::Categories => Category::TABLE,
            Self::OrderItems => OrderItem::TABLE,
        }
    }
}

/// Output of a successful upsert.
#[derive(Debug, Clone, Serialize)]
pub struct UpsertReport {
    pub table: &'static str,
    /// One identifier per input row, `-1` for excluded rows.
    pub ids: Vec<ResolvedId>,
    /// Input rows with placeholder ids replaced.
    pub rows: Vec<Value>,
}

fn endpoint_failed(err: AppError) -> AppError {
    err.propagate(Layer::Endpoint, "upsert_endpoint_failed")
}

fn parse_rows<R: CatalogRow>(values: Vec<Value>) -> Result<Vec<R>, AppError> {
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            serde_json::from_value(value).map_err(|e| {
                AppError::new(
                    ErrorKind::InvalidInput,
                    ErrorFrame::new(Layer::Endpoint, "invalid_input")
                        .message(format!("Row {} is not a valid {} row: {e}", index + 1, R::ENTITY))
                        .context("index", index),
                )
                .with_origin(e)
            })
        })
        .collect()
}

fn report<R: CatalogRow>(ids: Vec<ResolvedId>, rows: &[R]) -> Result<UpsertReport, AppError> {
    let rows = rows
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::unexpected(Layer::Endpoint, "render_rows", e))?;
    Ok(UpsertReport {
        table: R::TABLE,
        ids,
        rows,
    })
}

/// Upsert `values` as rows of `table`.
pub async fn upsert_values<S: UpsertSink>(
    sink: &S,
    table: CatalogTable,
    values: Vec<Value>,
    options: &UpsertOptions,
) -> Result<UpsertReport, AppError> {
    match table {
        CatalogTable::Products => {
            let mut rows: Vec<Product> = parse_rows(values)?;
            let ids = service::upsert_products(sink, &mut rows, options)
                .await
                .map_err(endpoint_failed)?;
            report(ids, &rows)
        }
        CatalogTable::Categories => {
            let mut rows: Vec<Category> = parse_rows(values)?;
            let ids = service::upsert_categories(sink, &mut rows, options)
                .await
                .map_err(endpoint_failed)?;
            report(ids, &rows)
        }
        CatalogTable::OrderItems => {
            let mut rows: Vec<OrderItem> = parse_rows(values)?;
            let ids = service::upsert_order_items(sink, &mut rows, options)
                .await
                .map_err(endpoint_failed)?;
            report(ids, &rows)
        }
    }
}

/// Read `path` and upsert its records as rows of `table`.
pub async fn upsert_file<S: UpsertSink>(
    sink: &S,
    table: CatalogTable,
    path: &Path,
    options: &UpsertOptions,
) -> Result<UpsertReport, AppError> {
    let values =
        input::read_values(path).map_err(|e| AppError::unexpected(Layer::Endpoint, "read_input", e))?;
    tracing::info!("Read {} records from {}", values.len(), path.display());
    upsert_values(sink, table, values, options).await
}

/// Parse a `field=value` exclusion rule. The value is read as JSON when it
/// parses, otherwise as a plain string.
pub fn parse_exclusion(rule: &str) -> Result<(String, Value)> {
    let (field, raw) = rule
        .split_once('=')
        .ok_or_else(|| anyhow!("Invalid exclusion '{rule}'. Expected field=value"))?;
    if field.is_empty() {
        return Err(anyhow!("Invalid exclusion '{rule}'. Field name is empty"));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((field.to_string(), value))
}

/// Deduplicate raw records without writing anything.
///
/// A record is excluded when any `(field, value)` pair in `exclusions`
/// matches it.
pub fn dedupe_values(
    values: Vec<Value>,
    ignored: &IgnoredFields,
    exclusions: &[(String, Value)],
) -> Result<Deduplicated> {
    let batch = values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            BatchItem::from_value(value)
                .ok_or_else(|| anyhow!("Record {} is not a JSON object", index + 1))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(deduplicate(
        &batch,
        |item| {
            exclusions
                .iter()
                .any(|(field, value)| item.get(field) == Some(value))
        },
        ignored,
    ))
}
