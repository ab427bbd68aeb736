//! Table state shared by the bundled stores.
//!
//! Upserts follow `INSERT .. ON CONFLICT (key) DO UPDATE` semantics: a row
//! whose conflict-key value already exists is updated in place and keeps its
//! identifier, anything else is inserted under a fresh identifier. A batch is
//! validated in full before any row changes.

use anyhow::{bail, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use sync_core::{canonical_value, BatchItem, ServerId, ID_FIELD};

use crate::traits::ConflictKey;

const CREATED_AT_FIELD: &str = "created_at";

/// Rows of one table plus its identifier sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableState {
    next_id: ServerId,
    rows: Vec<BatchItem>,
}

impl Default for TableState {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: Vec::new(),
        }
    }
}

impl TableState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[BatchItem] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Look up a row by identifier.
    pub fn get(&self, id: ServerId) -> Option<&BatchItem> {
        self.rows.iter().find(|row| row_id(row) == Some(id))
    }

    /// Upsert `items`, returning one identifier per item in input order.
    pub fn upsert(
        &mut self,
        table: &str,
        items: &[BatchItem],
        conflict_key: &ConflictKey,
    ) -> Result<Vec<ServerId>> {
        if conflict_key.fields().is_empty() {
            bail!("Upsert into {table} needs at least one conflict field");
        }

        let mut batch_keys = Vec::with_capacity(items.len());
        let mut seen = HashSet::new();
        for (position, item) in items.iter().enumerate() {
            let key = conflict_value(item, conflict_key).ok_or_else(|| {
                anyhow::anyhow!(
                    "Row {position} for {table} has no value for conflict key ({conflict_key})"
                )
            })?;
            if !seen.insert(key.clone()) {
                bail!(
                    "Batch for {table} would affect the row with ({conflict_key}) = {key} a second time"
                );
            }
            batch_keys.push(key);
        }

        let mut index: HashMap<String, usize> = HashMap::new();
        for (position, row) in self.rows.iter().enumerate() {
            if let Some(key) = conflict_value(row, conflict_key) {
                index.insert(key, position);
            }
        }

        let mut ids = Vec::with_capacity(items.len());
        for (item, key) in items.iter().zip(batch_keys) {
            match index.get(&key) {
                Some(&position) => {
                    let row = &mut self.rows[position];
                    let Some(id) = row_id(row) else {
                        bail!("Stored row in {table} at position {position} has no id");
                    };
                    for (field, value) in item.fields() {
                        if field != ID_FIELD {
                            row.insert(field.clone(), value.clone());
                        }
                    }
                    ids.push(id);
                }
                None => {
                    let id = self.next_id;
                    self.next_id += 1;
                    let mut row = item.clone();
                    row.insert(ID_FIELD, id);
                    if row.get(CREATED_AT_FIELD).is_none() {
                        row.insert(CREATED_AT_FIELD, Utc::now().to_rfc3339());
                    }
                    index.insert(key, self.rows.len());
                    self.rows.push(row);
                    ids.push(id);
                }
            }
        }

        Ok(ids)
    }
}

fn row_id(row: &BatchItem) -> Option<ServerId> {
    row.get(ID_FIELD).and_then(Value::as_i64)
}

/// Serialized conflict-key value, or `None` if any key field is missing or null.
fn conflict_value(item: &BatchItem, conflict_key: &ConflictKey) -> Option<String> {
    let mut values = Vec::with_capacity(conflict_key.fields().len());
    for field in conflict_key.fields() {
        match item.get(field) {
            None | Some(Value::Null) => return None,
            Some(value) => values.push(canonical_value(value)),
        }
    }
    Some(Value::Array(values).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(sku: &str, price: i64) -> BatchItem {
        BatchItem::new().with("sku", sku).with("price", price)
    }

    #[test]
    fn test_inserts_assign_sequential_ids() {
        let mut table = TableState::new();
        let ids = table
            .upsert(
                "Products",
                &[product("A", 1), product("B", 2)],
                &ConflictKey::single("sku"),
            )
            .unwrap();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(table.len(), 2);
        let row = table.get(2).unwrap();
        assert_eq!(row.get("sku").and_then(Value::as_str), Some("B"));
        assert!(row.get("created_at").is_some());
    }

    #[test]
    fn test_conflict_updates_in_place() {
        let mut table = TableState::new();
        let key = ConflictKey::single("sku");
        table
            .upsert("Products", &[product("A", 1), product("B", 2)], &key)
            .unwrap();
        let created = table.get(1).unwrap().get("created_at").cloned();

        let ids = table
            .upsert("Products", &[product("C", 3), product("A", 9)], &key)
            .unwrap();
        assert_eq!(ids, vec![3, 1]);
        assert_eq!(table.len(), 3);
        let row = table.get(1).unwrap();
        assert_eq!(row.get("price").unwrap(), 9);
        assert_eq!(row.get("created_at").cloned(), created);
    }

    #[test]
    fn test_integral_float_key_matches_integer_row() {
        let mut table = TableState::new();
        let key = ConflictKey::single("code");
        table
            .upsert("Products", &[BatchItem::new().with("code", 7)], &key)
            .unwrap();
        let ids = table
            .upsert(
                "Products",
                &[BatchItem::new().with("code", 7.0).with("price", 3)],
                &key,
            )
            .unwrap();
        assert_eq!(ids, vec![1]);
        assert_eq!(table.len(), 1);

        let err = table
            .upsert(
                "Products",
                &[
                    BatchItem::new().with("code", 8),
                    BatchItem::new().with("code", 8.0),
                ],
                &key,
            )
            .unwrap_err();
        assert!(err.to_string().contains("a second time"));
    }

    #[test]
    fn test_composite_key() {
        let mut table = TableState::new();
        let key = ConflictKey::new(["order_id", "product_id"]);
        let line = |order: i64, product: i64, qty: i64| {
            BatchItem::new()
                .with("order_id", order)
                .with("product_id", product)
                .with("quantity", qty)
        };
        let ids = table
            .upsert("Order_Items", &[line(1, 1, 2), line(1, 2, 1)], &key)
            .unwrap();
        assert_eq!(ids, vec![1, 2]);
        let ids = table
            .upsert("Order_Items", &[line(1, 2, 5), line(2, 1, 1)], &key)
            .unwrap();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_missing_conflict_field_rejects_whole_batch() {
        let mut table = TableState::new();
        let err = table
            .upsert(
                "Products",
                &[product("A", 1), BatchItem::new().with("price", 2)],
                &ConflictKey::single("sku"),
            )
            .unwrap_err();
        assert!(err.to_string().contains("no value for conflict key"));
        assert!(table.is_empty());
    }

    #[test]
    fn test_null_conflict_field_is_missing() {
        let mut table = TableState::new();
        let item = BatchItem::new().with("sku", Value::Null);
        assert!(table
            .upsert("Products", &[item], &ConflictKey::single("sku"))
            .is_err());
    }

    #[test]
    fn test_repeated_key_in_batch_is_rejected() {
        let mut table = TableState::new();
        let err = table
            .upsert(
                "Products",
                &[product("A", 1), product("A", 2)],
                &ConflictKey::single("sku"),
            )
            .unwrap_err();
        assert!(err.to_string().contains("a second time"));
        assert!(table.is_empty());
    }
}
