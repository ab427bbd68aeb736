//! Error frames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Layer that recorded a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layer {
    /// Data access: talks to the store.
    #[serde(rename = "DAL")]
    DataAccess,
    /// Application service: orchestrates data access calls.
    #[serde(rename = "SERVICE")]
    Service,
    /// Request handler.
    #[serde(rename = "ENDPOINT")]
    Endpoint,
    /// Page load.
    #[serde(rename = "LOAD")]
    Load,
    #[serde(rename = "UI")]
    Ui,
}

impl Layer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DataAccess => "DAL",
            Self::Service => "SERVICE",
            Self::Endpoint => "ENDPOINT",
            Self::Load => "LOAD",
            Self::Ui => "UI",
        }
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One layer's record of a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorFrame {
    pub layer: Layer,
    /// Short machine-readable code, e.g. `upsert_products_failed`.
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub context: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
}

impl ErrorFrame {
    pub fn new(layer: Layer, code: impl Into<String>) -> Self {
        Self {
            layer,
            code: code.into(),
            message: None,
            context: Map::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach one context field.
    pub fn context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}
