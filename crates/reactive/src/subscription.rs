//! Range-scoped subscriptions and their registry.
//!
//! A subscription covers a half-open `[start, end)` range over encoded key
//! bytes and carries synchronous per-kind listeners plus any number of
//! attached batch streams. The registry is an owned table on the engine
//! instance; covering ids are collected before listeners run, so closing a
//! subscription mid-dispatch is well defined.

use crate::batch::{BatchStream, FlushPolicy};
use crate::event::{ChangeKind, CloseCallback, EventCallback};
use alloc::vec::Vec;
use hashbrown::HashMap;

/// Unique identifier for a subscription.
pub type SubscriptionId = u64;

/// Identifies one batch stream attached to a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamId {
    pub subscription: SubscriptionId,
    pub index: usize,
}

/// A live subscription over a key range.
pub struct Subscription<T> {
    id: SubscriptionId,
    start: Vec<u8>,
    end: Vec<u8>,
    listeners: Vec<(ChangeKind, EventCallback)>,
    close_listeners: Vec<CloseCallback>,
    streams: Vec<BatchStream<T>>,
}

impl<T> Subscription<T> {
    fn new(id: SubscriptionId, start: Vec<u8>, end: Vec<u8>) -> Self {
        Self {
            id,
            start,
            end,
            listeners: Vec::new(),
            close_listeners: Vec::new(),
            streams: Vec::new(),
        }
    }

    /// Returns the subscription ID.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns true if the encoded key falls inside `[start, end)`.
    pub fn covers(&self, enc_key: &[u8]) -> bool {
        self.start.as_slice() <= enc_key && enc_key < self.end.as_slice()
    }

    /// Registers a synchronous listener for one change kind.
    pub fn on(&mut self, kind: ChangeKind, callback: EventCallback) {
        self.listeners.push((kind, callback));
    }

    /// Registers a close listener.
    pub fn on_close(&mut self, callback: CloseCallback) {
        self.close_listeners.push(callback);
    }

    /// Attaches a batch stream and returns its index.
    pub fn attach_stream(&mut self, policy: FlushPolicy) -> usize {
        self.streams.push(BatchStream::new(policy));
        self.streams.len() - 1
    }

    /// The attached batch streams.
    pub fn streams_mut(&mut self) -> &mut [BatchStream<T>] {
        &mut self.streams
    }

    /// Mutable access to one attached stream.
    pub fn stream_mut(&mut self, index: usize) -> Option<&mut BatchStream<T>> {
        self.streams.get_mut(index)
    }

    /// Listeners registered for the given kind.
    pub fn listeners_for(&mut self, kind: ChangeKind) -> impl Iterator<Item = &mut EventCallback> {
        self.listeners
            .iter_mut()
            .filter(move |(k, _)| *k == kind)
            .map(|(_, cb)| cb)
    }

    /// Consumes the subscription, firing close listeners and handing back the
    /// streams that are still armed.
    pub fn into_close(mut self) -> Vec<BatchStream<T>> {
        for cb in self.close_listeners.iter_mut() {
            cb();
        }
        self.streams.retain(|s| s.is_armed());
        self.streams
    }
}

/// The engine-owned table of live subscriptions.
pub struct SubscriberTable<T> {
    subscriptions: HashMap<SubscriptionId, Subscription<T>>,
    next_id: SubscriptionId,
}

impl<T> Default for SubscriberTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SubscriberTable<T> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            subscriptions: HashMap::new(),
            next_id: 1,
        }
    }

    /// Registers a subscription over encoded bounds and returns its ID.
    pub fn subscribe(&mut self, start: Vec<u8>, end: Vec<u8>) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;
        self.subscriptions.insert(id, Subscription::new(id, start, end));
        id
    }

    /// Looks up a subscription.
    pub fn get_mut(&mut self, id: SubscriptionId) -> Option<&mut Subscription<T>> {
        self.subscriptions.get_mut(&id)
    }

    /// Removes a subscription, returning it for close handling.
    pub fn remove(&mut self, id: SubscriptionId) -> Option<Subscription<T>> {
        self.subscriptions.remove(&id)
    }

    /// IDs of subscriptions covering the encoded key, in registration order.
    pub fn ids_covering(&self, enc_key: &[u8]) -> Vec<SubscriptionId> {
        let mut ids: Vec<SubscriptionId> = self
            .subscriptions
            .values()
            .filter(|s| s.covers(enc_key))
            .map(|s| s.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// IDs of all live subscriptions, in registration order.
    pub fn ids(&self) -> Vec<SubscriptionId> {
        let mut ids: Vec<SubscriptionId> = self.subscriptions.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Returns true if no subscription is live.
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}
