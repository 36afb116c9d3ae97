//! Property values stored in records.
//!
//! Records hold an untyped property bag in the original design; here the bag
//! is a mapping from property name to a closed `Value` variant so reducer and
//! projection contracts stay type-checked.

use alloc::string::String;
use alloc::vec::Vec;
use hashbrown::HashMap;

/// A record's property mapping.
pub type PropertyMap = HashMap<String, Value>;

/// A value stored under a record property.
#[derive(Clone, Debug)]
pub enum Value {
    /// Numeric value.
    Number(f64),
    /// UTF-8 text.
    Text(String),
    /// Ordered sequence of values.
    List(Vec<Value>),
    /// Nested mapping.
    Map(PropertyMap),
}

impl Value {
    /// Creates a text value.
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    /// Creates a numeric value.
    pub fn number(n: f64) -> Self {
        Value::Number(n)
    }

    /// Returns the number if this is a `Number`, `None` otherwise.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the string slice if this is `Text`, `None` otherwise.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Returns the list if this is a `List`, `None` otherwise.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Returns the nested mapping if this is a `Map`, `None` otherwise.
    pub fn as_map(&self) -> Option<&PropertyMap> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Returns true if this value is a scalar usable as a key component.
    pub fn is_scalar(&self) -> bool {
        matches!(self, Value::Number(_) | Value::Text(_))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            // total_cmp so NaN == NaN and repeated writes stay idempotent
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b).is_eq(),
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len() && a.iter().all(|(k, v)| b.get(k) == Some(v))
            }
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::text(s)
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
