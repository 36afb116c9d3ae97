//! Ordex Reactive - Subscription and batched delivery layer for Ordex.
//!
//! This crate holds the reactive building blocks the engine dispatches into:
//!
//! - `ChangeKind` / `BatchEntry`: typed change events
//! - `Subscription` / `SubscriberTable`: range-scoped listeners with an
//!   engine-owned registry
//! - `BatchStream` / `FlushPolicy`: time-windowed coalescing with kind
//!   escalation
//!
//! The engine forwards every mutation to the covering subscriptions; sync
//! listeners fire immediately, batch streams queue and fire on the
//! cooperative scheduler (next turn or a fixed delay).

#![no_std]

extern crate alloc;

pub mod batch;
pub mod event;
pub mod subscription;

pub use batch::{BatchStream, FlushPolicy};
pub use event::{BatchCallback, BatchEntry, ChangeKind, CloseCallback, EventCallback};
pub use subscription::{StreamId, SubscriberTable, Subscription, SubscriptionId};
