//! Composite index keys and their total order.
//!
//! A key is either a scalar (text or number) or a tuple of keys, plus the
//! reserved `Max` sentinel used as an open upper bound. Keys compare by:
//!
//! 1. type rank for the first differing component (`Number < Text < Tuple < Max`)
//! 2. natural ordering within the same type (numbers via `total_cmp`)
//! 3. prefix order for tuples: a strictly shorter tuple sorts immediately
//!    before any tuple that extends it
//!
//! The codec crate guarantees the encoded byte order matches this order.

use crate::error::{Error, Result};
use crate::value::Value;
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;
use core::cmp::Ordering;

/// The character appended to a scalar text start bound to form the default
/// end bound covering every string that extends it.
pub const MAX_TEXT_COMPONENT: char = '\u{10FFFF}';

/// A composite index key.
#[derive(Clone, Debug)]
pub enum Key {
    /// Numeric component, ordered numerically (not lexically).
    Number(f64),
    /// UTF-8 text component.
    Text(String),
    /// Tuple of nested components, with prefix ordering.
    Tuple(Vec<Key>),
    /// Reserved sentinel, greater than every concrete key. Bound-only.
    Max,
}

impl Key {
    /// Creates a text key.
    pub fn text(s: impl Into<String>) -> Self {
        Key::Text(s.into())
    }

    /// Creates a numeric key.
    pub fn number(n: f64) -> Self {
        Key::Number(n)
    }

    /// Creates a tuple key from components.
    pub fn tuple(parts: impl Into<Vec<Key>>) -> Self {
        Key::Tuple(parts.into())
    }

    /// Type rank used as the first comparison criterion.
    fn rank(&self) -> u8 {
        match self {
            Key::Number(_) => 0,
            Key::Text(_) => 1,
            Key::Tuple(_) => 2,
            Key::Max => 3,
        }
    }

    /// Returns true if this key contains the `Max` sentinel anywhere.
    pub fn contains_max(&self) -> bool {
        match self {
            Key::Max => true,
            Key::Tuple(parts) => parts.iter().any(Key::contains_max),
            _ => false,
        }
    }

    /// Validates a concrete key: the sentinel, empty scalar text and empty
    /// tuples are rejected. Empty text inside a tuple is allowed.
    pub fn validate(&self) -> Result<()> {
        match self {
            Key::Text(s) if s.is_empty() => Err(Error::invalid_key("empty text key")),
            Key::Tuple(parts) if parts.is_empty() => Err(Error::invalid_key("empty tuple key")),
            _ if self.contains_max() => Err(Error::invalid_key("sentinel is not a concrete key")),
            _ => Ok(()),
        }
    }

    /// Validates a range bound: like `validate`, but the sentinel is allowed.
    pub fn validate_bound(&self) -> Result<()> {
        match self {
            Key::Text(s) if s.is_empty() => Err(Error::invalid_key("empty text bound")),
            Key::Tuple(parts) if parts.is_empty() => Err(Error::invalid_key("empty tuple bound")),
            _ => Ok(()),
        }
    }

    /// Views the key as a flat component list: tuples yield their parts,
    /// scalars yield themselves. Used for pattern matching.
    pub fn components(&self) -> &[Key] {
        match self {
            Key::Tuple(parts) => parts.as_slice(),
            other => core::slice::from_ref(other),
        }
    }

    /// Returns the key extended by one trailing component, flattening a
    /// tuple key in place (`"foo" + id -> ["foo", id]`).
    pub fn extended(&self, part: Key) -> Key {
        match self {
            Key::Tuple(parts) => {
                let mut out = parts.clone();
                out.push(part);
                Key::Tuple(out)
            }
            other => Key::Tuple(vec![other.clone(), part]),
        }
    }

    /// Converts a scalar value into a key component, if possible.
    pub fn from_scalar(value: &Value) -> Option<Key> {
        match value {
            Value::Number(n) => Some(Key::Number(*n)),
            Value::Text(s) => Some(Key::Text(s.clone())),
            _ => None,
        }
    }

    /// Converts a key component into a property value. `Max` has no value form.
    pub fn to_value(&self) -> Option<Value> {
        match self {
            Key::Number(n) => Some(Value::Number(*n)),
            Key::Text(s) => Some(Value::Text(s.clone())),
            Key::Tuple(parts) => {
                let mut out = Vec::with_capacity(parts.len());
                for p in parts {
                    out.push(p.to_value()?);
                }
                Some(Value::List(out))
            }
            Key::Max => None,
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Text(s.to_string())
    }
}

impl From<f64> for Key {
    fn from(n: f64) -> Self {
        Key::Number(n)
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Key::Number(n as f64)
    }
}

impl From<Vec<Key>> for Key {
    fn from(parts: Vec<Key>) -> Self {
        Key::Tuple(parts)
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Key {}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Key::Number(a), Key::Number(b)) => a.total_cmp(b),
            (Key::Text(a), Key::Text(b)) => a.cmp(b),
            (Key::Tuple(a), Key::Tuple(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let ord = x.cmp(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (Key::Max, Key::Max) => Ordering::Equal,
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}
