//! Identifier reconciliation.
//!
//! Expands per-representative server identifiers back out to one identifier
//! per original batch position, and maps client-side temporary identifiers
//! onto the identifiers the store assigned.

use crate::dedupe::{PositionMap, Slot};
use crate::error::ReconcileError;
use crate::item::{ServerId, TempId};
use serde::{Serialize, Serializer};
use std::collections::HashMap;

/// Final identifier for one original batch position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolvedId {
    Assigned(ServerId),
    Excluded,
}

impl ResolvedId {
    /// Raw sentinel used by excluded positions.
    pub const EXCLUDED_RAW: i64 = -1;

    pub fn to_raw(self) -> i64 {
        match self {
            Self::Assigned(id) => id,
            Self::Excluded => Self::EXCLUDED_RAW,
        }
    }

    pub fn assigned(self) -> Option<ServerId> {
        match self {
            Self::Assigned(id) => Some(id),
            Self::Excluded => None,
        }
    }

    pub fn is_excluded(self) -> bool {
        matches!(self, Self::Excluded)
    }
}

impl Serialize for ResolvedId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.to_raw())
    }
}

/// Expand representative identifiers to one identifier per original position.
///
/// Fails if `server_ids` does not hold exactly one identifier per
/// representative, or if `positions` does not cover `original_length` slots.
pub fn expand(
    original_length: usize,
    positions: &PositionMap,
    server_ids: &[ServerId],
) -> Result<Vec<ResolvedId>, ReconcileError> {
    if positions.len() != original_length {
        return Err(ReconcileError::PositionCountMismatch {
            expected: original_length,
            actual: positions.len(),
        });
    }
    if server_ids.len() != positions.representatives() {
        return Err(ReconcileError::LengthMismatch {
            expected: positions.representatives(),
            actual: server_ids.len(),
        });
    }

    Ok(positions
        .slots()
        .iter()
        .map(|slot| match *slot {
            Slot::Representative(index) => ResolvedId::Assigned(server_ids[index]),
            Slot::Excluded => ResolvedId::Excluded,
        })
        .collect())
}

/// Temporary identifier → final identifier lookup.
///
/// Every final identifier also maps onto itself, so resolving an identifier
/// that was already rewritten is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TempIdMap {
    map: HashMap<ServerId, ServerId>,
}

impl TempIdMap {
    /// Pair `batch` with an expanded identifier list, skipping excluded
    /// positions.
    pub fn from_resolved<T: TempId>(batch: &[T], resolved: &[ResolvedId]) -> Self {
        let mut map = Self::default();
        for (item, id) in batch.iter().zip(resolved) {
            if let ResolvedId::Assigned(id) = *id {
                map.record(item.temp_id(), id);
            }
        }
        map
    }

    fn record(&mut self, temp: Option<ServerId>, id: ServerId) {
        if let Some(temp) = temp {
            self.map.insert(temp, id);
        }
        self.map.insert(id, id);
    }

    pub fn resolve(&self, id: ServerId) -> Option<ServerId> {
        self.map.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ServerId, ServerId)> + '_ {
        self.map.iter().map(|(k, v)| (*k, *v))
    }
}

/// Map each item's temporary identifier to the server identifier at the
/// same position.
///
/// Only the first `min(batch.len(), server_ids.len())` positions are paired.
/// Later pairs overwrite earlier ones on key collision.
pub fn build_temp_to_final_map<T: TempId>(batch: &[T], server_ids: &[ServerId]) -> TempIdMap {
    let mut map = TempIdMap::default();
    for (item, id) in batch.iter().zip(server_ids) {
        map.record(item.temp_id(), *id);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedupe::{deduplicate, never_excluded};
    use crate::item::{ignored_fields, BatchItem, IgnoredFields};

    #[test]
    fn test_expand_without_duplicates_is_identity() {
        let batch = vec![
            BatchItem::new().with("sku", "A"),
            BatchItem::new().with("sku", "B"),
            BatchItem::new().with("sku", "C"),
        ];
        let out = deduplicate(&batch, never_excluded, &IgnoredFields::new());
        let ids = expand(batch.len(), &out.positions, &[7, 8, 9]).unwrap();
        assert_eq!(
            ids,
            vec![
                ResolvedId::Assigned(7),
                ResolvedId::Assigned(8),
                ResolvedId::Assigned(9)
            ]
        );
    }

    #[test]
    fn test_expand_fans_out_duplicates() {
        let batch = vec![
            BatchItem::new().with("sku", "A").with("price", 1),
            BatchItem::new().with("sku", "A").with("price", 2),
            BatchItem::new().with("sku", "B").with("price", 3),
        ];
        let out = deduplicate(&batch, never_excluded, &ignored_fields(["price"]));
        let ids = expand(batch.len(), &out.positions, &[100, 200]).unwrap();
        let raw: Vec<i64> = ids.iter().map(|id| id.to_raw()).collect();
        assert_eq!(raw, vec![100, 100, 200]);
    }

    #[test]
    fn test_expand_marks_excluded() {
        let batch = vec![
            BatchItem::new().with("sku", "A"),
            BatchItem::new().with("sku", "B"),
        ];
        let out = deduplicate(
            &batch,
            |item| item.get("sku").and_then(|v| v.as_str()) == Some("B"),
            &IgnoredFields::new(),
        );
        assert_eq!(out.items.len(), 1);
        let ids = expand(2, &out.positions, &[100]).unwrap();
        assert_eq!(ids, vec![ResolvedId::Assigned(100), ResolvedId::Excluded]);
        assert_eq!(serde_json::to_string(&ids).unwrap(), "[100,-1]");
    }

    #[test]
    fn test_expand_rejects_length_mismatch() {
        let batch = vec![
            BatchItem::new().with("sku", "A"),
            BatchItem::new().with("sku", "B"),
        ];
        let out = deduplicate(&batch, never_excluded, &IgnoredFields::new());

        let err = expand(2, &out.positions, &[1]).unwrap_err();
        assert_eq!(
            err,
            ReconcileError::LengthMismatch {
                expected: 2,
                actual: 1
            }
        );

        let err = expand(2, &out.positions, &[1, 2, 3]).unwrap_err();
        assert!(matches!(err, ReconcileError::LengthMismatch { actual: 3, .. }));
    }

    #[test]
    fn test_expand_rejects_foreign_position_map() {
        let out = deduplicate(
            &[BatchItem::new().with("a", 1)],
            never_excluded,
            &IgnoredFields::new(),
        );
        let err = expand(4, &out.positions, &[1]).unwrap_err();
        assert_eq!(
            err,
            ReconcileError::PositionCountMismatch {
                expected: 4,
                actual: 1
            }
        );
    }

    #[test]
    fn test_temp_map_resolves_temp_and_final_ids() {
        let batch = vec![
            BatchItem::new().with("id", -1).with("sku", "A"),
            BatchItem::new().with("sku", "B"),
            BatchItem::new().with("id", -2).with("sku", "C"),
        ];
        let map = build_temp_to_final_map(&batch, &[10, 11, 12]);
        assert_eq!(map.resolve(-1), Some(10));
        assert_eq!(map.resolve(-2), Some(12));
        assert_eq!(map.len(), 5);
        for id in [10, 11, 12] {
            assert_eq!(map.resolve(id), Some(id));
        }
        assert_eq!(map.resolve(-3), None);
    }

    #[test]
    fn test_temp_map_stops_at_shorter_input() {
        let batch = vec![
            BatchItem::new().with("id", -1),
            BatchItem::new().with("id", -2),
        ];
        let map = build_temp_to_final_map(&batch, &[5]);
        assert_eq!(map.resolve(-1), Some(5));
        assert_eq!(map.resolve(-2), None);
    }

    #[test]
    fn test_temp_map_last_write_wins() {
        let batch = vec![
            BatchItem::new().with("id", -1),
            BatchItem::new().with("id", -1),
        ];
        let map = build_temp_to_final_map(&batch, &[5, 6]);
        assert_eq!(map.resolve(-1), Some(6));
    }

    #[test]
    fn test_temp_map_from_resolved_skips_excluded() {
        let batch = vec![
            BatchItem::new().with("id", -1),
            BatchItem::new().with("id", -2),
            BatchItem::new().with("id", -3),
        ];
        let resolved = vec![
            ResolvedId::Assigned(40),
            ResolvedId::Excluded,
            ResolvedId::Assigned(40),
        ];
        let map = TempIdMap::from_resolved(&batch, &resolved);
        assert_eq!(map.resolve(-1), Some(40));
        assert_eq!(map.resolve(-2), None);
        assert_eq!(map.resolve(-3), Some(40));
        assert_eq!(map.resolve(ResolvedId::EXCLUDED_RAW), None);
        assert_eq!(map.resolve(40), Some(40));
    }
}
