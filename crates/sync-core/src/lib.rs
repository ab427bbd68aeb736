//! Core pipeline for deduplicated bulk upserts.
//!
//! This crate holds the pure, synchronous half of a bulk write:
//!
//! - [`deduplicate`] - collapse logically equal [`BatchItem`]s to one
//!   representative each, producing a [`PositionMap`]
//! - [`expand`] - fan the store's per-representative identifiers back out to
//!   one [`ResolvedId`] per original position
//! - [`build_temp_to_final_map`] / [`TempIdMap`] - map client-side temporary
//!   identifiers onto the identifiers the store assigned
//!
//! # Architecture
//!
//! ```text
//! raw batch ──deduplicate──▶ representatives + PositionMap
//!                                   │
//!                             (UpsertSink, async)
//!                                   ▼
//!                          server ids per representative
//!                                   │
//!                     expand / build_temp_to_final_map
//!                                   ▼
//!                 ids per original position, TempIdMap
//! ```
//!
//! # Example
//!
//! ```rust
//! use sync_core::{deduplicate, expand, ignored_fields, never_excluded, BatchItem};
//!
//! let batch = vec![
//!     BatchItem::new().with("sku", "A").with("price", 1),
//!     BatchItem::new().with("sku", "A").with("price", 2),
//!     BatchItem::new().with("sku", "B").with("price", 3),
//! ];
//! let out = deduplicate(&batch, never_excluded, &ignored_fields(["price"]));
//! assert_eq!(out.items.len(), 2);
//!
//! let ids = expand(batch.len(), &out.positions, &[100, 200]).unwrap();
//! let raw: Vec<i64> = ids.iter().map(|id| id.to_raw()).collect();
//! assert_eq!(raw, vec![100, 100, 200]);
//! ```

pub mod dedupe;
pub mod error;
pub mod item;
pub mod reconcile;

pub use dedupe::{deduplicate, never_excluded, Deduplicated, PositionMap, Slot};
pub use error::ReconcileError;
pub use item::{
    canonical_value, ignored_fields, BatchItem, DedupeKey, IgnoredFields, ServerId, TempId,
    ID_FIELD,
};
pub use reconcile::{build_temp_to_final_map, expand, ResolvedId, TempIdMap};
