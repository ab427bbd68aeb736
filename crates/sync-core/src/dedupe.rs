//! Batch deduplication.
//!
//! Collapses logically equivalent items to one representative and records,
//! for every original position, which representative stands in for it.

use crate::item::{BatchItem, DedupeKey, IgnoredFields};
use serde::{Serialize, Serializer};
use std::collections::HashMap;

/// Where an original batch position ended up after deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Index into [`Deduplicated::items`].
    Representative(usize),
    /// Matched the exclusion predicate; never written.
    Excluded,
}

impl Slot {
    /// Raw index form, with `-1` for excluded positions.
    pub fn to_raw(self) -> i64 {
        match self {
            Self::Representative(index) => index as i64,
            Self::Excluded => -1,
        }
    }
}

impl Serialize for Slot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.to_raw())
    }
}

/// Original position → representative mapping.
///
/// Holds exactly one slot per original batch position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PositionMap {
    slots: Vec<Slot>,
    #[serde(skip)]
    representatives: usize,
}

impl PositionMap {
    /// Number of original positions.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of distinct representatives referenced by the map.
    pub fn representatives(&self) -> usize {
        self.representatives
    }

    pub fn get(&self, position: usize) -> Option<Slot> {
        self.slots.get(position).copied()
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Number of positions marked excluded.
    pub fn excluded(&self) -> usize {
        self.slots.iter().filter(|s| **s == Slot::Excluded).count()
    }

    fn push_excluded(&mut self) {
        self.slots.push(Slot::Excluded);
    }

    fn push_existing(&mut self, index: usize) {
        self.slots.push(Slot::Representative(index));
    }

    fn push_new(&mut self) -> usize {
        let index = self.representatives;
        self.representatives += 1;
        self.slots.push(Slot::Representative(index));
        index
    }
}

/// Output of [`deduplicate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Deduplicated {
    /// Representatives in first-occurrence order.
    pub items: Vec<BatchItem>,
    /// One slot per original position.
    pub positions: PositionMap,
}

/// Collapse duplicate items in `batch`.
///
/// Items for which `exclusion` returns true are marked [`Slot::Excluded`] and
/// never compared. Every other item is keyed by [`BatchItem::dedupe_key`];
/// the first item seen with a given key becomes the representative and later
/// items with the same key point at it.
pub fn deduplicate<F>(batch: &[BatchItem], exclusion: F, ignored: &IgnoredFields) -> Deduplicated
where
    F: Fn(&BatchItem) -> bool,
{
    let mut seen: HashMap<DedupeKey, usize> = HashMap::new();
    let mut items = Vec::new();
    let mut positions = PositionMap::default();

    for item in batch {
        if exclusion(item) {
            positions.push_excluded();
            continue;
        }

        let key = item.dedupe_key(ignored);
        match seen.get(&key) {
            Some(&index) => positions.push_existing(index),
            None => {
                let index = positions.push_new();
                items.push(item.clone());
                seen.insert(key, index);
            }
        }
    }

    Deduplicated { items, positions }
}

/// Exclusion predicate that never excludes.
pub fn never_excluded(_: &BatchItem) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ignored_fields;
    use serde_json::json;

    fn scenario_batch() -> Vec<BatchItem> {
        vec![
            BatchItem::new().with("sku", "A").with("price", 1),
            BatchItem::new().with("sku", "A").with("price", 2),
            BatchItem::new().with("sku", "B").with("price", 3),
        ]
    }

    #[test]
    fn test_empty_batch() {
        let out = deduplicate(&[], never_excluded, &IgnoredFields::new());
        assert!(out.items.is_empty());
        assert!(out.positions.is_empty());
        assert_eq!(out.positions.representatives(), 0);
    }

    #[test]
    fn test_distinct_prices_stay_distinct() {
        let out = deduplicate(&scenario_batch(), never_excluded, &IgnoredFields::new());
        assert_eq!(out.items.len(), 3);
        assert_eq!(
            out.positions.slots(),
            &[
                Slot::Representative(0),
                Slot::Representative(1),
                Slot::Representative(2)
            ]
        );
    }

    #[test]
    fn test_ignored_price_collapses_same_sku() {
        let batch = scenario_batch();
        let out = deduplicate(&batch, never_excluded, &ignored_fields(["price"]));
        assert_eq!(out.items, vec![batch[0].clone(), batch[2].clone()]);
        assert_eq!(
            out.positions.slots(),
            &[
                Slot::Representative(0),
                Slot::Representative(0),
                Slot::Representative(1)
            ]
        );
        assert_eq!(out.positions.representatives(), 2);
    }

    #[test]
    fn test_excluded_items_are_never_written() {
        let batch = vec![
            BatchItem::new().with("sku", "A"),
            BatchItem::new().with("sku", "A").with("skip", true),
        ];
        let out = deduplicate(
            &batch,
            |item| item.get("skip") == Some(&json!(true)),
            &ignored_fields(["skip"]),
        );
        assert_eq!(out.items, vec![batch[0].clone()]);
        assert_eq!(
            out.positions.slots(),
            &[Slot::Representative(0), Slot::Excluded]
        );
        assert_eq!(out.positions.excluded(), 1);
    }

    #[test]
    fn test_fully_ignored_items_collapse_together() {
        let batch = vec![
            BatchItem::new().with("created_at", "2024-01-01"),
            BatchItem::new().with("created_at", "2024-02-01"),
            BatchItem::new(),
        ];
        let out = deduplicate(&batch, never_excluded, &ignored_fields(["created_at"]));
        assert_eq!(out.items.len(), 1);
        assert!(out
            .positions
            .slots()
            .iter()
            .all(|slot| *slot == Slot::Representative(0)));
    }

    #[test]
    fn test_integral_float_collapses_with_integer() {
        let batch = vec![
            BatchItem::from_value(json!({"sku": "A", "qty": 1})).unwrap(),
            BatchItem::from_value(json!({"sku": "A", "qty": 1.0})).unwrap(),
        ];
        let out = deduplicate(&batch, never_excluded, &IgnoredFields::new());
        assert_eq!(out.items, vec![batch[0].clone()]);
        assert_eq!(
            out.positions.slots(),
            &[Slot::Representative(0), Slot::Representative(0)]
        );
    }

    #[test]
    fn test_representatives_follow_first_occurrence() {
        let batch = vec![
            BatchItem::new().with("slug", "c"),
            BatchItem::new().with("slug", "a"),
            BatchItem::new().with("slug", "c"),
            BatchItem::new().with("slug", "b"),
            BatchItem::new().with("slug", "a"),
        ];
        let out = deduplicate(&batch, never_excluded, &IgnoredFields::new());
        let slugs: Vec<_> = out
            .items
            .iter()
            .map(|item| item.get("slug").and_then(|v| v.as_str()).unwrap())
            .collect();
        assert_eq!(slugs, vec!["c", "a", "b"]);
        let raw: Vec<i64> = out.positions.slots().iter().map(|s| s.to_raw()).collect();
        assert_eq!(raw, vec![0, 1, 0, 2, 1]);
    }

    #[test]
    fn test_position_map_serializes_raw_slots() {
        let batch = vec![BatchItem::new().with("a", 1), BatchItem::new().with("b", 2)];
        let out = deduplicate(&batch, |item| item.get("b").is_some(), &IgnoredFields::new());
        assert_eq!(serde_json::to_value(&out.positions).unwrap(), json!([0, -1]));
    }
}
