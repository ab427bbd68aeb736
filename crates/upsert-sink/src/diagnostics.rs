//! Opt-in diagnostic output for bulk upserts.
//!
//! Payload dumps are gated by a `Diagnostics` value handed to the pipeline,
//! so two callers in one process can run with different settings.

use sync_core::{Deduplicated, ResolvedId};

/// Switch for verbose pipeline output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostics {
    enabled: bool,
}

impl Diagnostics {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Report the outcome of deduplicating a batch.
    pub fn deduplicated(&self, table: &str, original: usize, deduped: &Deduplicated) {
        if !self.enabled {
            return;
        }
        tracing::info!(
            table,
            original,
            unique = deduped.items.len(),
            excluded = deduped.positions.excluded(),
            "Deduplicated batch"
        );
        match serde_json::to_string(&deduped.positions) {
            Ok(positions) => tracing::info!(table, %positions, "Position map"),
            Err(e) => tracing::warn!(table, "Could not render position map: {e}"),
        }
        for (index, item) in deduped.items.iter().enumerate() {
            match serde_json::to_string(item) {
                Ok(item) => tracing::info!(table, index, %item, "Representative"),
                Err(e) => tracing::warn!(table, index, "Could not render representative: {e}"),
            }
        }
    }

    /// Report the identifiers assigned to every original position.
    pub fn reconciled(&self, table: &str, ids: &[ResolvedId]) {
        if !self.enabled {
            return;
        }
        let raw: Vec<i64> = ids.iter().map(|id| id.to_raw()).collect();
        tracing::info!(table, ids = ?raw, "Reconciled identifiers");
    }
}
