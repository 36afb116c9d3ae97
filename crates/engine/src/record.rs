//! Records: one mutable property mapping per key.
//!
//! Records live in an arena owned by the `Indexer`; `RecordId` is the stable
//! public identity (repeated reads of the same key return the same id, and
//! mutation through any path is visible to every holder). A record tracks
//! which reducer properties are pending recomputation and which projection
//! results it currently produces.

use crate::definition::DefinitionId;
use alloc::string::String;
use alloc::vec::Vec;
use ordex_core::{Key, PropertyMap};

/// Stable handle to a record in the indexer arena.
pub type RecordId = usize;

/// A record: one key, one property mapping.
pub struct Record {
    key: Key,
    pub(crate) definition: DefinitionId,
    pub(crate) props: PropertyMap,
    /// Reducer property names pending recomputation, deduplicated.
    pub(crate) dirty: Vec<String>,
    /// Projection results currently produced: (rule index, encoded derived key).
    pub(crate) produced: Vec<(usize, Vec<u8>)>,
}

impl Record {
    /// Creates a record seeded with the given properties.
    pub(crate) fn new(key: Key, definition: DefinitionId, props: PropertyMap) -> Self {
        Self {
            key,
            definition,
            props,
            dirty: Vec::new(),
            produced: Vec::new(),
        }
    }

    /// The record's key.
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// The current property mapping, without flushing pending reducers.
    pub fn props(&self) -> &PropertyMap {
        &self.props
    }

    /// Marks a reducer property as pending recomputation.
    pub(crate) fn mark_dirty(&mut self, property: &str) {
        if !self.dirty.iter().any(|p| p == property) {
            self.dirty.push(String::from(property));
        }
    }

    /// Removes and returns the pending names matching `filter` (all of them
    /// when no filter is given). Names outside the filter stay pending.
    pub(crate) fn take_dirty(&mut self, filter: Option<&[String]>) -> Vec<String> {
        match filter {
            None => core::mem::take(&mut self.dirty),
            Some(fields) => {
                let mut taken = Vec::new();
                self.dirty.retain(|name| {
                    if fields.iter().any(|f| f == name) {
                        taken.push(name.clone());
                        false
                    } else {
                        true
                    }
                });
                taken
            }
        }
    }
}
