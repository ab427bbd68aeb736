//! UpsertSink trait definition.
//!
//! This trait is the boundary between the pure deduplication pipeline and
//! whatever persistent store assigns row identifiers.

use anyhow::Result;
use std::fmt;
use sync_core::{BatchItem, ServerId};

/// Field names whose combined value identifies a row for upsert purposes.
///
/// A product is keyed by `sku`, a category by `slug`, an order item by the
/// `(order_id, product_id)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictKey(Vec<String>);

impl ConflictKey {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(fields.into_iter().map(Into::into).collect())
    }

    pub fn single(field: impl Into<String>) -> Self {
        Self(vec![field.into()])
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for ConflictKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(", "))
    }
}

/// Trait for writing deduplicated rows to a persistent store.
///
/// # Usage Pattern
///
/// Callers use generics for static dispatch:
///
/// ```ignore
/// pub async fn upsert_products<S: UpsertSink>(sink: &S, rows: &[Product]) -> Result<()> {
///     let ids = sink.upsert("Products", &items, &ConflictKey::single("sku")).await?;
/// }
/// ```
///
/// The CLI entry point picks a store once, and after that all code is
/// monomorphized for that implementation.
#[async_trait::async_trait]
pub trait UpsertSink: Send + Sync {
    /// Insert or update `items` in `table`, matching existing rows on
    /// `conflict_key`.
    ///
    /// Returns exactly one identifier per item, in input order. A failure
    /// applies to the whole batch; implementations must not report partial
    /// success.
    async fn upsert(
        &self,
        table: &str,
        items: &[BatchItem],
        conflict_key: &ConflictKey,
    ) -> Result<Vec<ServerId>>;
}
