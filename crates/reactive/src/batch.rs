//! Time-windowed coalescing of change notifications.
//!
//! A `BatchStream` owns a pending queue keyed by encoded key. Notifications
//! for the same key inside one scheduling window collapse to a single entry
//! under the escalation rule: an `Added` followed by an `Updated` stays
//! `Added`; any other incoming kind overwrites, and the payload handle is
//! always replaced by the latest. The stream arms its trigger on the
//! empty-to-non-empty transition and fires one batch when due.

use crate::event::{BatchCallback, ChangeKind};
use alloc::vec::Vec;
use ordex_store::OrderedStore;

/// When an armed stream becomes due.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlushPolicy {
    /// Fire on the next scheduler turn.
    NextTurn,
    /// Fire once the given number of milliseconds has elapsed.
    Delay(u64),
}

/// A coalescing stream attached to one subscription.
///
/// `T` is the payload handle forwarded with each queued change (the engine
/// uses its record handle and resolves the value at flush time).
pub struct BatchStream<T> {
    policy: FlushPolicy,
    pending: OrderedStore<(ChangeKind, T)>,
    due: Option<u64>,
    callback: Option<BatchCallback>,
}

impl<T> BatchStream<T> {
    /// Creates an idle stream with the given policy.
    pub fn new(policy: FlushPolicy) -> Self {
        Self {
            policy,
            pending: OrderedStore::new(),
            due: None,
            callback: None,
        }
    }

    /// Registers the batch callback, replacing any previous one.
    pub fn set_callback(&mut self, callback: BatchCallback) {
        self.callback = Some(callback);
    }

    /// Mutable access to the batch callback.
    pub fn callback_mut(&mut self) -> Option<&mut BatchCallback> {
        self.callback.as_mut()
    }

    /// Returns true if the stream holds queued changes.
    pub fn is_armed(&self) -> bool {
        self.due.is_some()
    }

    /// Returns true if an armed stream should fire at `now`.
    pub fn is_due(&self, now: u64) -> bool {
        self.due.is_some_and(|due| due <= now)
    }

    /// Queues one change, applying the escalation rule. Arms the trigger on
    /// the empty-to-non-empty transition and returns true when it did.
    pub fn enqueue(&mut self, now: u64, kind: ChangeKind, enc_key: &[u8], payload: T) -> bool {
        match self.pending.get_mut(enc_key) {
            Some(entry) => {
                let escalated = match (entry.0, kind) {
                    (ChangeKind::Added, ChangeKind::Updated) => ChangeKind::Added,
                    (_, incoming) => incoming,
                };
                *entry = (escalated, payload);
                false
            }
            None => {
                let was_empty = self.pending.is_empty();
                self.pending.put(enc_key.to_vec(), (kind, payload));
                if was_empty && self.due.is_none() {
                    self.due = Some(match self.policy {
                        FlushPolicy::NextTurn => now,
                        FlushPolicy::Delay(ms) => now + ms,
                    });
                    return true;
                }
                false
            }
        }
    }

    /// Drains the queue in ascending key order and disarms the trigger.
    pub fn take(&mut self) -> Vec<(Vec<u8>, ChangeKind, T)> {
        self.due = None;
        self.pending
            .drain()
            .into_iter()
            .map(|(k, (kind, payload))| (k, kind, payload))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use ordex_codec::encode;
    use ordex_core::Key;

    fn enc(name: &str) -> Vec<u8> {
        encode(&Key::text(name)).unwrap()
    }

    #[test]
    fn test_arms_on_first_enqueue_only() {
        let mut stream = BatchStream::new(FlushPolicy::NextTurn);
        assert!(stream.enqueue(0, ChangeKind::Updated, &enc("a"), 1));
        assert!(!stream.enqueue(0, ChangeKind::Updated, &enc("b"), 2));
        assert!(stream.is_due(0));
    }

    #[test]
    fn test_same_key_coalesces_to_latest() {
        let mut stream = BatchStream::new(FlushPolicy::NextTurn);
        stream.enqueue(0, ChangeKind::Updated, &enc("a"), 1);
        stream.enqueue(0, ChangeKind::Updated, &enc("a"), 2);
        let batch = stream.take();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].1, ChangeKind::Updated);
        assert_eq!(batch[0].2, 2);
    }

    #[test]
    fn test_add_then_update_escalates_to_add() {
        let mut stream = BatchStream::new(FlushPolicy::NextTurn);
        stream.enqueue(0, ChangeKind::Added, &enc("a"), 1);
        stream.enqueue(0, ChangeKind::Updated, &enc("a"), 2);
        let batch = stream.take();
        assert_eq!(batch[0].1, ChangeKind::Added);
        assert_eq!(batch[0].2, 2);
    }

    #[test]
    fn test_update_then_remove_overwrites() {
        let mut stream = BatchStream::new(FlushPolicy::NextTurn);
        stream.enqueue(0, ChangeKind::Updated, &enc("a"), 1);
        stream.enqueue(0, ChangeKind::Removed, &enc("a"), 1);
        let batch = stream.take();
        assert_eq!(batch[0].1, ChangeKind::Removed);
    }

    #[test]
    fn test_delay_policy_due_time() {
        let mut stream = BatchStream::new(FlushPolicy::Delay(100));
        stream.enqueue(50, ChangeKind::Updated, &enc("a"), 1);
        assert!(!stream.is_due(50));
        assert!(!stream.is_due(149));
        assert!(stream.is_due(150));
    }

    #[test]
    fn test_take_drains_in_key_order_and_disarms() {
        let mut stream = BatchStream::new(FlushPolicy::NextTurn);
        stream.enqueue(0, ChangeKind::Updated, &enc("b"), 2);
        stream.enqueue(0, ChangeKind::Updated, &enc("a"), 1);
        let batch = stream.take();
        assert_eq!(batch.iter().map(|e| e.2).collect::<Vec<_>>(), vec![1, 2]);
        assert!(!stream.is_armed());
        assert!(stream.take().is_empty());
    }
}
