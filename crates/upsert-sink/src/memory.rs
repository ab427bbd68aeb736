//! In-memory upsert store.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use sync_core::{BatchItem, ServerId};
use tokio::sync::Mutex;

use crate::table::TableState;
use crate::traits::{ConflictKey, UpsertSink};

/// Upsert store keeping every table in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, TableState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed `table` with existing state, replacing anything stored under it.
    pub fn with_table(mut self, table: impl Into<String>, state: TableState) -> Self {
        self.tables.get_mut().insert(table.into(), state);
        self
    }

    /// Copy of a table's current state, if it has ever been written.
    pub async fn table(&self, table: &str) -> Option<TableState> {
        self.tables.lock().await.get(table).cloned()
    }
}

#[async_trait]
impl UpsertSink for MemoryStore {
    async fn upsert(
        &self,
        table: &str,
        items: &[BatchItem],
        conflict_key: &ConflictKey,
    ) -> Result<Vec<ServerId>> {
        let mut tables = self.tables.lock().await;
        let state = tables.entry(table.to_string()).or_default();
        let ids = state.upsert(table, items, conflict_key)?;
        tracing::debug!("Upserted {} rows into in-memory table {table}", ids.len());
        Ok(ids)
    }
}
