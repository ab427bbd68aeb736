//! Filesystem-based upsert store.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use sync_core::{BatchItem, ServerId};
use tokio::sync::Mutex;

use crate::table::TableState;
use crate::traits::{ConflictKey, UpsertSink};

/// Filesystem implementation of the UpsertSink trait.
///
/// Stores each table as a JSON file named `{table}.json` in a directory.
/// Writes within one process are serialized; the file is replaced only
/// after the whole batch has been applied, by writing `{table}.json.tmp`
/// and renaming it over the old file.
pub struct FilesystemStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FilesystemStore {
    /// Create a new FilesystemStore with the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Get the directory path.
    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.json"))
    }

    /// Read a table from disk. Missing files read as an empty table.
    pub fn read_table(&self, table: &str) -> Result<TableState> {
        let path = self.table_path(table);
        if !path.exists() {
            return Ok(TableState::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read table file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse table file {}", path.display()))
    }
}

#[async_trait]
impl UpsertSink for FilesystemStore {
    async fn upsert(
        &self,
        table: &str,
        items: &[BatchItem],
        conflict_key: &ConflictKey,
    ) -> Result<Vec<ServerId>> {
        let _guard = self.write_lock.lock().await;

        let mut state = self.read_table(table)?;
        let ids = state.upsert(table, items, conflict_key)?;

        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create store directory {}", self.dir.display()))?;
        let path = self.table_path(table);
        let tmp_path = self.dir.join(format!("{table}.json.tmp"));
        std::fs::write(&tmp_path, serde_json::to_string_pretty(&state)?)
            .with_context(|| format!("Failed to write table file {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &path)
            .with_context(|| format!("Failed to replace table file {}", path.display()))?;
        tracing::info!("Stored {} rows of {table} to {}", state.len(), path.display());
        Ok(ids)
    }
}
