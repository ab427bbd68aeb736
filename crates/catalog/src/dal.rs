//! Data access: typed rows in, one resolved identifier per row out.

use app_error::{AppError, ErrorFrame, ErrorKind, Layer};
use serde_json::Value;
use sync_core::{ignored_fields, BatchItem, ResolvedId, ID_FIELD};
use upsert_sink::{BulkUpsert, BulkWriteError, ConflictKey, Diagnostics, UpsertSink};

use crate::row::CatalogRow;

const CREATED_AT_FIELD: &str = "created_at";
const IS_ACTIVE_FIELD: &str = "is_active";

/// Knobs for one bulk upsert.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpsertOptions {
    /// Skip rows whose `is_active` is `false`.
    pub exclude_inactive: bool,
    pub diagnostics: Diagnostics,
}

fn is_inactive(item: &BatchItem) -> bool {
    item.get(IS_ACTIVE_FIELD) == Some(&Value::Bool(false))
}

/// Upsert `rows` into `R::TABLE`.
///
/// Identifiers and creation timestamps on the rows are dropped before the
/// write; the store owns both. Duplicate rows share the identifier of their
/// first occurrence.
pub async fn upsert_rows<R, S>(
    sink: &S,
    rows: &[R],
    options: &UpsertOptions,
) -> Result<Vec<ResolvedId>, AppError>
where
    R: CatalogRow,
    S: UpsertSink,
{
    let mut items = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let mut item = row.to_item().map_err(|e| {
            AppError::new(
                ErrorKind::InvalidInput,
                ErrorFrame::new(Layer::DataAccess, format!("encode_{}_failed", R::ENTITY))
                    .message(format!("Failed to encode {} row", R::ENTITY))
                    .context("index", index),
            )
            .with_origin(e)
        })?;
        item.remove(ID_FIELD);
        item.remove(CREATED_AT_FIELD);
        items.push(item);
    }

    let conflict_key = ConflictKey::new(R::CONFLICT_KEY.iter().copied());
    let ignored = ignored_fields(R::NON_UNIQUE.iter().copied());
    let exclude_inactive = options.exclude_inactive;

    let outcome = BulkUpsert::new(sink, options.diagnostics)
        .run(
            R::TABLE,
            &items,
            &conflict_key,
            |item| exclude_inactive && is_inactive(item),
            &ignored,
        )
        .await
        .map_err(|e| {
            let kind = match e {
                BulkWriteError::WriteFailed { .. } => ErrorKind::WriteFailed,
                BulkWriteError::Reconcile { .. } => ErrorKind::LengthMismatch,
            };
            AppError::new(
                kind,
                ErrorFrame::new(Layer::DataAccess, format!("upsert_{}_failed", R::ENTITY))
                    .message(format!("Failed to upsert {}", R::ENTITY))
                    .context("count", items.len())
                    .context("reason", e.code()),
            )
            .with_origin(e)
        })?;

    tracing::info!(
        "Upserted {} {} ({} unique) into {}",
        rows.len(),
        R::ENTITY,
        outcome.written,
        R::TABLE
    );
    Ok(outcome.ids)
}
