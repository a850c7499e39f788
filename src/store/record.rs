//! Records, attribute values and index keys

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A scalar attribute value.
///
/// Serialises as a bare JSON number or string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Number(_) => None,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// Attribute name -> value.
pub type Attributes = HashMap<String, Value>;

/// A keyed record owned by the indexed store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub attributes: Attributes,
}

impl Record {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: HashMap::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// The attribute as a finite number, if it is one.
    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key)
            .and_then(Value::as_number)
            .filter(|n| n.is_finite())
    }
}

/// Hashable form of a [`Value`] used as a secondary-index bucket key.
///
/// Numbers are keyed by bit pattern with `-0.0` folded into `0.0`; NaN is
/// never indexed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexKey {
    Number(u64),
    Text(String),
}

impl IndexKey {
    pub fn number(n: f64) -> Option<Self> {
        if n.is_nan() {
            return None;
        }
        let n = if n == 0.0 { 0.0 } else { n };
        Some(IndexKey::Number(n.to_bits()))
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Self::number(*n),
            Value::Text(s) => Some(IndexKey::Text(s.clone())),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            IndexKey::Number(bits) => Some(f64::from_bits(*bits)),
            IndexKey::Text(_) => None,
        }
    }
}
