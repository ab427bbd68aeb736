//! Service layer: validation, DAL calls, and temporary id rewriting.
//!
//! Rows may arrive with negative placeholder ids so that other in-memory
//! objects can reference them before the store assigns real ones. After a
//! successful write every placeholder is replaced with its final id.

use app_error::{AppError, ErrorFrame, ErrorKind, FrameExt, Layer};
use sync_core::{ResolvedId, TempIdMap};
use upsert_sink::UpsertSink;

use crate::dal::{self, UpsertOptions};
use crate::row::{CatalogRow, Category, OrderItem, Product};
use crate::validation::{
    slugify, validate_category, validate_order_item, validate_product, ValidationReport,
};

/// Upsert `rows` and rewrite their placeholder ids in place.
///
/// Returns one identifier per row. Rows carrying a non-negative id are left
/// untouched, as are excluded rows.
pub async fn upsert_rows<R, S>(
    sink: &S,
    rows: &mut [R],
    options: &UpsertOptions,
) -> Result<Vec<ResolvedId>, AppError>
where
    R: CatalogRow,
    S: UpsertSink,
{
    let count = rows.len();
    let ids = dal::upsert_rows(sink, &*rows, options).await.with_frame(|| {
        ErrorFrame::new(Layer::Service, format!("upsert_{}_service_failed", R::ENTITY))
            .message(format!("Upsert of {} failed", R::ENTITY))
            .context("count", count)
    })?;

    let id_map = TempIdMap::from_resolved(&*rows, &ids);
    let mut rewritten = 0;
    for row in rows.iter_mut() {
        let Some(temp) = row.id().filter(|id| *id < 0) else {
            continue;
        };
        if let Some(id) = id_map.resolve(temp) {
            row.set_id(id);
            rewritten += 1;
        }
    }
    tracing::debug!("Rewrote {rewritten} placeholder ids in {}", R::ENTITY);

    Ok(ids)
}

fn check_rows<R, F>(rows: &[R], validate: F) -> Result<(), AppError>
where
    R: CatalogRow,
    F: Fn(&R) -> ValidationReport,
{
    for (index, row) in rows.iter().enumerate() {
        let report = validate(row);
        if !report.is_valid() {
            tracing::warn!("Rejected {} row {index}: {:?}", R::ENTITY, report.errors);
            let message = report.errors.join("; ");
            return Err(AppError::new(
                ErrorKind::InvalidInput,
                ErrorFrame::new(Layer::Service, format!("invalid_{}", R::ENTITY))
                    .message(message)
                    .context("index", index)
                    .context("errors", report.errors),
            ));
        }
    }
    Ok(())
}

pub async fn upsert_products<S: UpsertSink>(
    sink: &S,
    products: &mut [Product],
    options: &UpsertOptions,
) -> Result<Vec<ResolvedId>, AppError> {
    check_rows(&*products, validate_product)?;
    upsert_rows(sink, products, options).await
}

/// Upsert categories, deriving a slug from the name where none was given.
pub async fn upsert_categories<S: UpsertSink>(
    sink: &S,
    categories: &mut [Category],
    options: &UpsertOptions,
) -> Result<Vec<ResolvedId>, AppError> {
    for category in categories.iter_mut() {
        if category.slug.trim().is_empty() {
            category.slug = slugify(&category.name);
        }
    }
    check_rows(&*categories, validate_category)?;
    upsert_rows(sink, categories, options).await
}

pub async fn upsert_order_items<S: UpsertSink>(
    sink: &S,
    items: &mut [OrderItem],
    options: &UpsertOptions,
) -> Result<Vec<ResolvedId>, AppError> {
    check_rows(&*items, validate_order_item)?;
    upsert_rows(sink, items, options).await
}
