//! Deduplicate → upsert → reconcile.

use sync_core::{deduplicate, expand, BatchItem, IgnoredFields, ReconcileError, ResolvedId};
use thiserror::Error;

use crate::diagnostics::Diagnostics;
use crate::traits::{ConflictKey, UpsertSink};

/// Failure of a bulk write.
///
/// Neither variant leaves partially reconciled identifiers behind.
#[derive(Debug, Error)]
pub enum BulkWriteError {
    /// The store rejected the batch.
    #[error("write to {table} failed: {source}")]
    WriteFailed {
        table: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The store answered with identifiers that do not match the batch.
    #[error("identifiers returned for {table} do not match the batch: {source}")]
    Reconcile {
        table: String,
        #[source]
        source: ReconcileError,
    },
}

impl BulkWriteError {
    /// Short machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::WriteFailed { .. } => "write_failed",
            Self::Reconcile { .. } => "length_mismatch",
        }
    }

    pub fn table(&self) -> &str {
        match self {
            Self::WriteFailed { table, .. } | Self::Reconcile { table, .. } => table,
        }
    }
}

/// Result of a successful bulk write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkUpsertOutcome {
    /// One identifier per original batch position.
    pub ids: Vec<ResolvedId>,
    /// Number of representatives sent to the store.
    pub written: usize,
}

/// Runs a batch through deduplication, the store, and reconciliation.
pub struct BulkUpsert<'a, S: UpsertSink> {
    sink: &'a S,
    diagnostics: Diagnostics,
}

impl<'a, S: UpsertSink> BulkUpsert<'a, S> {
    pub fn new(sink: &'a S, diagnostics: Diagnostics) -> Self {
        Self { sink, diagnostics }
    }

    /// Write `batch` to `table`.
    ///
    /// Items matching `exclusion` are skipped and come back as
    /// [`ResolvedId::Excluded`]. Fields in `ignored` do not keep two items
    /// apart during deduplication. The store is not called when nothing is
    /// left to write.
    pub async fn run<F>(
        &self,
        table: &str,
        batch: &[BatchItem],
        conflict_key: &ConflictKey,
        exclusion: F,
        ignored: &IgnoredFields,
    ) -> Result<BulkUpsertOutcome, BulkWriteError>
    where
        F: Fn(&BatchItem) -> bool,
    {
        let deduped = deduplicate(batch, exclusion, ignored);
        self.diagnostics.deduplicated(table, batch.len(), &deduped);

        let server_ids = if deduped.items.is_empty() {
            Vec::new()
        } else {
            self.sink
                .upsert(table, &deduped.items, conflict_key)
                .await
                .map_err(|e| {
                    tracing::warn!("Upsert of {} rows into {table} failed: {e:#}", deduped.items.len());
                    BulkWriteError::WriteFailed {
                        table: table.to_string(),
                        source: e.into(),
                    }
                })?
        };

        let ids = expand(batch.len(), &deduped.positions, &server_ids).map_err(|source| {
            BulkWriteError::Reconcile {
                table: table.to_string(),
                source,
            }
        })?;
        self.diagnostics.reconciled(table, &ids);

        tracing::debug!(
            "Upserted {} of {} rows into {table} on ({conflict_key})",
            deduped.items.len(),
            batch.len()
        );

        Ok(BulkUpsertOutcome {
            ids,
            written: deduped.items.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use sync_core::{ignored_fields, never_excluded, ServerId};

    /// Sink answering every batch with a fixed identifier list.
    struct FixedSink {
        ids: Vec<ServerId>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl UpsertSink for FixedSink {
        async fn upsert(
            &self,
            _table: &str,
            _items: &[BatchItem],
            _conflict_key: &ConflictKey,
        ) -> anyhow::Result<Vec<ServerId>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.ids.clone())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl UpsertSink for FailingSink {
        async fn upsert(
            &self,
            _table: &str,
            _items: &[BatchItem],
            _conflict_key: &ConflictKey,
        ) -> anyhow::Result<Vec<ServerId>> {
            anyhow::bail!("connection reset")
        }
    }

    fn scenario_batch() -> Vec<BatchItem> {
        vec![
            BatchItem::new().with("sku", "A").with("price", 1),
            BatchItem::new().with("sku", "A").with("price", 2),
            BatchItem::new().with("sku", "B").with("price", 3),
        ]
    }

    #[tokio::test]
    async fn test_duplicates_share_server_id() {
        let sink = FixedSink {
            ids: vec![100, 200],
            calls: AtomicUsize::new(0),
        };
        let outcome = BulkUpsert::new(&sink, Diagnostics::default())
            .run(
                "Products",
                &scenario_batch(),
                &ConflictKey::single("sku"),
                never_excluded,
                &ignored_fields(["price"]),
            )
            .await
            .unwrap();
        let raw: Vec<i64> = outcome.ids.iter().map(|id| id.to_raw()).collect();
        assert_eq!(raw, vec![100, 100, 200]);
        assert_eq!(outcome.written, 2);
    }

    #[tokio::test]
    async fn test_short_id_list_is_length_mismatch() {
        let sink = FixedSink {
            ids: vec![100],
            calls: AtomicUsize::new(0),
        };
        let err = BulkUpsert::new(&sink, Diagnostics::default())
            .run(
                "Products",
                &scenario_batch(),
                &ConflictKey::single("sku"),
                never_excluded,
                &ignored_fields(["price"]),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "length_mismatch");
        assert_eq!(err.table(), "Products");
        assert!(matches!(
            err,
            BulkWriteError::Reconcile {
                source: ReconcileError::LengthMismatch {
                    expected: 2,
                    actual: 1
                },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_write_failure_propagates() {
        let err = BulkUpsert::new(&FailingSink, Diagnostics::new(true))
            .run(
                "Categories",
                &[BatchItem::new().with("slug", "a")],
                &ConflictKey::single("slug"),
                never_excluded,
                &IgnoredFields::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "write_failed");
        assert!(err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_fully_excluded_batch_skips_the_store() {
        let sink = FixedSink {
            ids: vec![],
            calls: AtomicUsize::new(0),
        };
        let outcome = BulkUpsert::new(&sink, Diagnostics::default())
            .run(
                "Products",
                &scenario_batch(),
                &ConflictKey::single("sku"),
                |_| true,
                &IgnoredFields::new(),
            )
            .await
            .unwrap();
        assert_eq!(outcome.ids, vec![ResolvedId::Excluded; 3]);
        assert_eq!(outcome.written, 0);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_against_memory_store() {
        let store = MemoryStore::new();
        let pipeline = BulkUpsert::new(&store, Diagnostics::default());
        let key = ConflictKey::single("sku");
        let ignored = ignored_fields(["price"]);

        let first = pipeline
            .run("Products", &scenario_batch(), &key, never_excluded, &ignored)
            .await
            .unwrap();
        let raw: Vec<i64> = first.ids.iter().map(|id| id.to_raw()).collect();
        assert_eq!(raw, vec![1, 1, 2]);

        let again = pipeline
            .run(
                "Products",
                &[BatchItem::new().with("sku", "B").with("price", 7)],
                &key,
                never_excluded,
                &ignored,
            )
            .await
            .unwrap();
        assert_eq!(again.ids, vec![ResolvedId::Assigned(2)]);
    }
}
