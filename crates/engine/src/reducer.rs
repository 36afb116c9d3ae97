//! Reducers: aggregated fields computed from keyed contributions.
//!
//! A reducer owns a secondary ordered store of raw contributed values keyed
//! by `(owner key, contributor id)`. Contributions mark the owner's property
//! dirty; the aggregate is recomputed lazily when the owner is next read.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use ordex_core::{Key, Result, Value};
use ordex_store::OrderedStore;

/// A pure aggregation function over the ordered contribution values.
pub type AggregateFn = Box<dyn Fn(&[Value]) -> Value>;

/// An aggregation rule producing one property from many contributions.
pub struct Reducer {
    property: String,
    func: AggregateFn,
    contributions: OrderedStore<Value>,
}

impl Reducer {
    /// Creates a reducer for the named property.
    pub(crate) fn new(property: String, func: AggregateFn) -> Self {
        Self {
            property,
            func,
            contributions: OrderedStore::new(),
        }
    }

    /// The property this reducer maintains.
    pub fn property(&self) -> &str {
        &self.property
    }

    /// Upserts one contribution. A value-identical contribution is a no-op;
    /// returns true when the stored contribution actually changed.
    pub(crate) fn set(&mut self, owner: &Key, contributor: &Key, value: Value) -> Result<bool> {
        let enc = ordex_codec::encode(&owner.extended(contributor.clone()))?;
        if self.contributions.get(&enc) == Some(&value) {
            return Ok(false);
        }
        self.contributions.put(enc, value);
        Ok(true)
    }

    /// Recomputes the aggregate over every contribution whose key has the
    /// owner key as prefix, in ascending contributor order.
    pub(crate) fn run(&self, owner: &Key) -> Result<Value> {
        let prefix = Key::Tuple(owner.components().to_vec());
        let (start, end) = ordex_store::range_bounds(Some(&prefix), None)?;
        let mut values = Vec::new();
        self.contributions.walk_asc(&start, &end, |_, v| {
            values.push(v.clone());
            true
        });
        Ok((self.func)(&values))
    }
}
