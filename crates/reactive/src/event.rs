//! Change events and the callback types subscriptions accept.

use alloc::boxed::Box;
use ordex_core::{Key, PropertyMap};

/// The kind of change reported for a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    /// A record was created (or a projection materialized).
    Added,
    /// A record's properties changed.
    Updated,
    /// A projection result was retracted.
    Removed,
}

/// One entry of a flushed batch.
#[derive(Clone, Debug)]
pub struct BatchEntry {
    /// The kind the window coalesced to.
    pub kind: ChangeKind,
    /// The decoded key.
    pub key: Key,
    /// The value read at flush time; `None` for `Removed` entries.
    pub value: Option<PropertyMap>,
}

/// Synchronous per-event listener: `(decoded key, current value)`.
pub type EventCallback = Box<dyn FnMut(&Key, &PropertyMap)>;

/// Listener invoked once when a subscription closes.
pub type CloseCallback = Box<dyn FnMut()>;

/// Listener receiving one coalesced batch per flush.
pub type BatchCallback = Box<dyn FnMut(&[BatchEntry])>;
