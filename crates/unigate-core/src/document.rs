//! Schemaless documents
//!
//! A `Document` is a JSON object. Stored documents always carry a string `id`
//! plus the field named by their container's partition key path; everything
//! else is optional.

use crate::entity::PartitionKeyPath;
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fields owned by the store. They are written on every store write and never
/// accepted from callers.
pub const SYSTEM_FIELDS: [&str; 2] = ["_etag", "_ts"];

/// A schemaless JSON document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str).filter(|s| !s.is_empty())
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.0.insert("id".to_string(), Value::String(id.into()));
    }

    /// Version token written by the store, if any
    pub fn etag(&self) -> Option<&str> {
        self.0.get("_etag").and_then(Value::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// A field counts as present unless it is absent, null or an empty string
    pub fn has_value(&self, field: &str) -> bool {
        match self.0.get(field) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(_) => true,
        }
    }

    /// String form of the partition key field.
    ///
    /// Numbers and booleans are rendered; objects and arrays cannot act as a
    /// partition key and yield `None`.
    pub fn partition_key_value(&self, path: &PartitionKeyPath) -> Option<String> {
        match self.0.get(path.field())? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Shallow merge: every top-level field of `patch` overwrites the field of
    /// the same name here. Nested objects are replaced wholesale.
    pub fn merge(&mut self, patch: &Document) {
        for (field, value) in &patch.0 {
            self.0.insert(field.clone(), value.clone());
        }
    }

    /// Returns a copy of `self` with `patch` merged on top
    pub fn merged(&self, patch: &Document) -> Document {
        let mut merged = self.clone();
        merged.merge(patch);
        merged
    }

    /// Drop store-owned fields
    pub fn strip_system_fields(&mut self) {
        for field in SYSTEM_FIELDS {
            self.0.remove(field);
        }
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

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Document {
    type Error = CoreError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(CoreError::InvalidDocument(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

impl From<Document> for Value {
    fn from(document: Document) -> Self {
        document.into_value()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
