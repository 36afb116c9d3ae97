//! Ordex Store - Ordered byte-keyed storage for the Ordex reactive index.
//!
//! A thin semantic wrapper around the ordered-map primitive
//! (`alloc::collections::BTreeMap`): point get/put/delete plus ascending and
//! descending half-open range walks with early termination. The engine keys
//! every store with `ordex-codec` encodings, so byte order is key order.
//!
//! This crate also owns the range bound defaulting rules shared by range
//! reads, reducer prefix scans and subscriptions:
//!
//! - both bounds absent: everything up to the sentinel key
//! - `start` only, tuple: end is the start extended with the `Max` component
//! - `start` only, scalar text: end is the text extended with the maximum
//!   text component
//! - `start` only, scalar number: end is `[start, Max]`

#![no_std]

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::ops::Bound;
use ordex_core::{Key, Result, MAX_TEXT_COMPONENT};

/// An ordered map from encoded key bytes to values of type `T`.
#[derive(Clone, Debug, Default)]
pub struct OrderedStore<T> {
    entries: BTreeMap<Vec<u8>, T>,
}

impl<T> OrderedStore<T> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Point lookup.
    pub fn get(&self, key: &[u8]) -> Option<&T> {
        self.entries.get(key)
    }

    /// Mutable point lookup.
    pub fn get_mut(&mut self, key: &[u8]) -> Option<&mut T> {
        self.entries.get_mut(key)
    }

    /// Inserts or replaces, returning the previous value if any.
    pub fn put(&mut self, key: Vec<u8>, value: T) -> Option<T> {
        self.entries.insert(key, value)
    }

    /// Removes an entry, returning it if present.
    pub fn delete(&mut self, key: &[u8]) -> Option<T> {
        self.entries.remove(key)
    }

    /// Returns true if the key is present.
    pub fn contains(&self, key: &[u8]) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes and returns all entries in ascending key order.
    pub fn drain(&mut self) -> Vec<(Vec<u8>, T)> {
        core::mem::take(&mut self.entries).into_iter().collect()
    }

    /// Walks `[start, end)` in ascending key order. The visitor returns
    /// `false` to stop early.
    pub fn walk_asc<F>(&self, start: &[u8], end: &[u8], mut visit: F)
    where
        F: FnMut(&[u8], &T) -> bool,
    {
        if start >= end {
            return;
        }
        for (k, v) in self
            .entries
            .range::<[u8], _>((Bound::Included(start), Bound::Excluded(end)))
        {
            if !visit(k, v) {
                break;
            }
        }
    }

    /// Walks `[start, end)` in descending key order. The visitor returns
    /// `false` to stop early.
    pub fn walk_desc<F>(&self, start: &[u8], end: &[u8], mut visit: F)
    where
        F: FnMut(&[u8], &T) -> bool,
    {
        if start >= end {
            return;
        }
        for (k, v) in self
            .entries
            .range::<[u8], _>((Bound::Included(start), Bound::Excluded(end)))
            .rev()
        {
            if !visit(k, v) {
                break;
            }
        }
    }
}

/// Resolves optional range bounds to encoded `[start, end)` bytes, applying
/// the defaulting rules described in the crate docs.
pub fn range_bounds(start: Option<&Key>, end: Option<&Key>) -> Result<(Vec<u8>, Vec<u8>)> {
    let start_bytes = match start {
        Some(key) => ordex_codec::encode_bound(key)?,
        None => Vec::new(),
    };
    let end_bytes = match (end, start) {
        (Some(key), _) => ordex_codec::encode_bound(key)?,
        (None, Some(key)) => ordex_codec::encode_bound(&default_end(key))?,
        (None, None) => ordex_codec::encode_bound(&Key::Max)?,
    };
    Ok((start_bytes, end_bytes))
}

/// The default exclusive end bound for a lone start key.
fn default_end(start: &Key) -> Key {
    match start {
        Key::Tuple(parts) => {
            let mut out = parts.clone();
            out.push(Key::Max);
            Key::Tuple(out)
        }
        Key::Text(s) => {
            let mut out = String::with_capacity(s.len() + 4);
            out.push_str(s);
            out.push(MAX_TEXT_COMPONENT);
            Key::Text(out)
        }
        other => Key::Tuple(alloc::vec![other.clone(), Key::Max]),
    }
}
