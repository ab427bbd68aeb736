//! Upsert executor abstraction and bulk upsert pipeline.
//!
//! This crate defines the `UpsertSink` trait, the boundary to whatever store
//! assigns row identifiers, and `BulkUpsert`, which runs a batch through
//! deduplication, one awaited write, and identifier reconciliation.
//!
//! Bundled stores:
//!
//! - `MemoryStore` - tables held in process memory
//! - `FilesystemStore` - one JSON file per table

mod diagnostics;
mod filesystem;
mod memory;
mod pipeline;
mod store_kind;
mod table;
mod traits;

pub use diagnostics::Diagnostics;
pub use filesystem::FilesystemStore;
pub use memory::MemoryStore;
pub use pipeline::{BulkUpsert, BulkUpsertOutcome, BulkWriteError};
pub use store_kind::StoreKind;
pub use table::TableState;
pub use traits::{ConflictKey, UpsertSink};
