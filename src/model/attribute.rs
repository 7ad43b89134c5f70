//! Attributes: typed properties attached to annotations

use super::id::ItemId;
use super::Metadata;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Typed attribute values
///
/// Serialized untagged: the JSON form is the plain value. Variant order
/// matters for deserialization: `Date` must be tried before `String` so
/// ISO dates come back typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Date(NaiveDate),
    String(String),
    /// Structured payloads (arrays, objects) that don't fit a scalar variant
    Json(Value),
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<NaiveDate> for AttrValue {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl std::fmt::Display for AttrValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Date(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "{}", v),
            Self::Json(v) => write!(f, "{}", v),
        }
    }
}

/// A typed property attached to exactly one annotation.
///
/// The `uid` is immutable; `value` and `metadata` are set at creation and
/// not expected to change afterwards. An attribute belongs to the
/// annotation it was added to; propagating it elsewhere means cloning it
/// under a fresh uid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Unique identifier
    pub uid: ItemId,
    /// Attribute label (e.g. "is_negated")
    pub label: String,
    /// Optional typed payload
    pub value: Option<AttrValue>,
    /// Free-form metadata
    #[serde(default)]
    pub metadata: Metadata,
}

impl Attribute {
    /// Create an attribute with the given label and no value
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            uid: ItemId::new(),
            label: label.into(),
            value: None,
            metadata: Metadata::new(),
        }
    }

    /// Set the value
    pub fn with_value(mut self, value: impl Into<AttrValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Rebuild an attribute under a specific uid (reconstruction from a
    /// serialized form, copies with preserved identity)
    pub fn with_uid(mut self, uid: ItemId) -> Self {
        self.uid = uid;
        self
    }
}
