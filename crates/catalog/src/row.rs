//! Catalog row types.
//!
//! Each row type names its table, the conflict key the store upserts on,
//! and the fields that must not keep two rows apart during deduplication.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sync_core::{BatchItem, ServerId, TempId};
use thiserror::Error;

/// Errors converting between typed rows and batch items.
#[derive(Debug, Error)]
pub enum RowError {
    #[error("failed to convert {table} row: {source}")]
    Json {
        table: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{table} row did not serialize to an object")]
    NotAnObject { table: &'static str },
}

/// A row type that can be bulk upserted.
pub trait CatalogRow: Serialize + DeserializeOwned + Clone + Send + Sync + TempId {
    /// Table name in the store.
    const TABLE: &'static str;

    /// Plural entity name used in error codes, e.g. `products`.
    const ENTITY: &'static str;

    /// Fields whose combined value identifies a row.
    const CONFLICT_KEY: &'static [&'static str];

    /// Fields left out of the dedupe key.
    const NON_UNIQUE: &'static [&'static str];

    fn id(&self) -> Option<ServerId>;

    fn set_id(&mut self, id: ServerId);

    fn to_item(&self) -> Result<BatchItem, RowError> {
        let value = serde_json::to_value(self).map_err(|source| RowError::Json {
            table: Self::TABLE,
            source,
        })?;
        BatchItem::from_value(value).ok_or(RowError::NotAnObject { table: Self::TABLE })
    }

    fn from_item(item: BatchItem) -> Result<Self, RowError> {
        serde_json::from_value(Value::from(item)).map_err(|source| RowError::Json {
            table: Self::TABLE,
            source,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ServerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub category_id: ServerId,
    pub sku: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_quantity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl TempId for Product {
    fn temp_id(&self) -> Option<ServerId> {
        self.id
    }
}

impl CatalogRow for Product {
    const TABLE: &'static str = "Products";
    const ENTITY: &'static str = "products";
    const CONFLICT_KEY: &'static [&'static str] = &["sku"];
    const NON_UNIQUE: &'static [&'static str] = &[
        "name",
        "description",
        "price",
        "category_id",
        "stock_quantity",
        "is_active",
        "image_url",
        "metadata",
    ];

    fn id(&self) -> Option<ServerId> {
        self.id
    }

    fn set_id(&mut self, id: ServerId) {
        self.id = Some(id);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ServerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ServerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,
}

impl TempId for Category {
    fn temp_id(&self) -> Option<ServerId> {
        self.id
    }
}

impl CatalogRow for Category {
    const TABLE: &'static str = "Categories";
    const ENTITY: &'static str = "categories";
    const CONFLICT_KEY: &'static [&'static str] = &["slug"];
    const NON_UNIQUE: &'static [&'static str] = &["name", "parent_id", "description", "sort_order"];

    fn id(&self) -> Option<ServerId> {
        self.id
    }

    fn set_id(&mut self, id: ServerId) {
        self.id = Some(id);
    }
}

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ServerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    pub order_id: ServerId,
    pub product_id: ServerId,
    pub quantity: i64,
    pub unit_price: f64,
    pub total_price: f64,
    #[serde(default)]
    pub product_name: String,
}

impl TempId for OrderItem {
    fn temp_id(&self) -> Option<ServerId> {
        self.id
    }
}

impl CatalogRow for OrderItem {
    const TABLE: &'static str = "Order_Items";
    const ENTITY: &'static str = "order_items";
    const CONFLICT_KEY: &'static [&'static str] = &["order_id", "product_id"];
    const NON_UNIQUE: &'static [&'static str] =
        &["quantity", "unit_price", "total_price", "product_name"];

    fn id(&self) -> Option<ServerId> {
        self.id
    }

    fn set_id(&mut self, id: ServerId) {
        self.id = Some(id);
    }
}
