//! Catalog rows and their bulk upserts.
//!
//! Layering follows the frame chain in `app-error`:
//!
//! - [`dal`] turns typed rows into batch items and runs the
//!   deduplicate → upsert → reconcile pipeline, recording `DAL` frames
//! - [`service`] validates rows, calls the DAL, rewrites placeholder ids and
//!   records `SERVICE` frames
//!
//! Row types implement [`CatalogRow`], which fixes the table, conflict key
//! and non-unique fields for each.

pub mod dal;
pub mod row;
pub mod service;
pub mod validation;

pub use dal::UpsertOptions;
pub use row::{CatalogRow, Category, OrderItem, Product, RowError};
pub use validation::{
    slugify, validate_category, validate_order_item, validate_product, ValidationReport,
};
