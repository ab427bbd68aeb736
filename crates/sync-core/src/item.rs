//! Batch item representation.
//!
//! A [`BatchItem`] is one candidate row for a bulk upsert: a JSON object whose
//! shape is only known through the fields that take part in equality checks.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Identifier assigned by the persistent store.
pub type ServerId = i64;

/// Field carrying a client-side (pre-write) identifier.
pub const ID_FIELD: &str = "id";

/// Set of field names left out of the dedupe key.
pub type IgnoredFields = BTreeSet<String>;

/// Build an [`IgnoredFields`] set from string slices.
pub fn ignored_fields<I, S>(fields: I) -> IgnoredFields
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    fields.into_iter().map(Into::into).collect()
}

/// One candidate row to persist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchItem(Map<String, Value>);

impl BatchItem {
    /// Create an empty item.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an item from a JSON value. Returns `None` for non-objects.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Builder-style field setter.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Client-side identifier carried in the `id` field, if it is an integer.
    pub fn temp_id(&self) -> Option<ServerId> {
        self.0.get(ID_FIELD).and_then(Value::as_i64)
    }

    /// Canonical key over every field not listed in `ignored`.
    ///
    /// Entries are ordered by field name so two items with the same
    /// comparison-relevant content produce the same key regardless of
    /// insertion order.
    pub fn dedupe_key(&self, ignored: &IgnoredFields) -> DedupeKey {
        let relevant: BTreeMap<&str, &Value> = self
            .0
            .iter()
            .filter(|(field, _)| !ignored.contains(field.as_str()))
            .map(|(field, value)| (field.as_str(), value))
            .collect();

        let mut key = String::new();
        for (i, (field, value)) in relevant.into_iter().enumerate() {
            if i > 0 {
                key.push(',');
            }
            key.push_str(&Value::from(field).to_string());
            key.push(':');
            key.push_str(&canonical_value(value).to_string());
        }
        DedupeKey(key)
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for BatchItem {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<BatchItem> for Value {
    fn from(item: BatchItem) -> Self {
        Value::Object(item.0)
    }
}

/// Copy of `value` with every integral float rewritten as an integer.
///
/// `1` and `1.0` serialize to the same text afterwards. Arrays and objects
/// are rewritten recursively.
pub fn canonical_value(value: &Value) -> Value {
    match value {
        Value::Number(number) if number.is_f64() => match number.as_f64() {
            Some(float)
                if float.fract() == 0.0
                    && float >= i64::MIN as f64
                    && float < i64::MAX as f64 =>
            {
                Value::from(float as i64)
            }
            _ => value.clone(),
        },
        Value::Array(items) => Value::Array(items.iter().map(canonical_value).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(field, value)| (field.clone(), canonical_value(value)))
                .collect(),
        ),
        _ => value.clone(),
    }
}

/// Types carrying an optional client-side identifier.
pub trait TempId {
    fn temp_id(&self) -> Option<ServerId>;
}

impl TempId for BatchItem {
    fn temp_id(&self) -> Option<ServerId> {
        BatchItem::temp_id(self)
    }
}

/// Canonical serialization of an item's comparison-relevant fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DedupeKey(String);

impl DedupeKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DedupeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
