//! ordex-engine: the reactive index engine.
//!
//! Ties the lower crates together into one `Indexer` instance:
//!
//! - an ordered primary store of encoded keys mapping to stable record
//!   handles (`ordex-store`, `ordex-codec`)
//! - definitions claiming key patterns, hosting reducers and projections
//! - range-scoped subscriptions with synchronous listeners and coalescing
//!   batch streams (`ordex-reactive`), driven by a logical clock
//!
//! Writes run to completion synchronously; only batch flushing is deferred
//! to `tick`/`advance` turns.

#![no_std]

extern crate alloc;

mod definition;
mod indexer;
mod projection;
mod record;
mod reducer;

pub use definition::{
    Definition, DefinitionId, Lifecycle, LifecycleCallback, PatternPart, DEFAULT_DEFINITION,
};
pub use indexer::{
    Indexer, LogEvent, LogPhase, LogSink, Order, Patch, RangeOptions, ReducerField,
};
pub use projection::{Derived, KeySpec, ProjectionRule, TemplatePart};
pub use record::{Record, RecordId};
pub use reducer::{AggregateFn, Reducer};

pub use ordex_core::{Error, Key, PropertyMap, Result, Value, MAX_TEXT_COMPONENT};
pub use ordex_reactive::{BatchEntry, ChangeKind, FlushPolicy, StreamId, SubscriptionId};
