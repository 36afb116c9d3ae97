//! The indexer: primary store, arenas, write pipeline and dispatch.
//!
//! All state is owned here: the record and definition arenas, the primary
//! ordered store mapping encoded keys to record handles, the subscriber
//! table and the cooperative scheduler clock. Cross-references are handles
//! into the arenas, never owning references.
//!
//! A write runs to completion synchronously in a fixed order: plain
//! properties and reducer contributions are applied first, then the owning
//! definition's `Changed` lifecycle fires, then every projection rule of the
//! definition re-runs (dispatching derived add/update/remove events inline),
//! and finally the `Updated` event for the source key is dispatched. The
//! only deferred work is batch flushing, driven by `tick`/`advance`.

use crate::definition::{
    Definition, DefinitionId, Lifecycle, LifecycleCallback, PatternPart, DEFAULT_DEFINITION,
};
use crate::projection::{materialize, KeySpec, ProjectionRule};
use crate::record::{Record, RecordId};
use crate::reducer::Reducer;
use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use hashbrown::HashMap;
use ordex_codec::{decode, encode};
use ordex_core::{Error, Key, PropertyMap, Result, Value};
use ordex_reactive::{
    BatchEntry, BatchStream, ChangeKind, FlushPolicy, StreamId, SubscriberTable, SubscriptionId,
};
use ordex_store::{range_bounds, OrderedStore};

/// One property assignment in a patch.
pub enum Patch {
    /// A plain property value, compare-and-swapped.
    Plain(Value),
    /// A reducer contribution: `(contributor id, raw value)`.
    Reduce { contributor: Key, value: Value },
}

/// Walk direction for range reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Order {
    /// Ascending key order.
    Asc,
    /// Descending key order.
    Desc,
}

/// Options for `get_range`.
#[derive(Clone, Debug)]
pub struct RangeOptions {
    pub order: Order,
    pub limit: Option<usize>,
}

impl Default for RangeOptions {
    fn default() -> Self {
        Self {
            order: Order::Asc,
            limit: None,
        }
    }
}

/// Observational lifecycle log events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogEvent {
    Subscribe,
    Unsubscribe,
}

/// Phase of an observational log event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogPhase {
    Enter,
    Exit,
}

/// Observational sink for subscribe/unsubscribe lifecycle pairs.
pub type LogSink = Box<dyn FnMut(LogEvent, LogPhase)>;

/// Handle returned by `create_reduced_field`.
pub struct ReducerField {
    property: String,
}

impl ReducerField {
    /// The reduced property name, usable with `contribute`.
    pub fn property(&self) -> &str {
        &self.property
    }
}

/// The in-memory, ordered, reactive index.
pub struct Indexer {
    primary: OrderedStore<RecordId>,
    records: Vec<Record>,
    definitions: Vec<Definition>,
    lifecycle: HashMap<DefinitionId, Vec<LifecycleCallback>>,
    subscribers: SubscriberTable<RecordId>,
    /// Streams from closed subscriptions that were already armed; each fires
    /// once more, then drops.
    draining: Vec<BatchStream<RecordId>>,
    log: Option<LogSink>,
    now: u64,
}

impl Default for Indexer {
    fn default() -> Self {
        Self::new()
    }
}

impl Indexer {
    /// Creates an empty indexer with the implicit default definition.
    pub fn new() -> Self {
        Self {
            primary: OrderedStore::new(),
            records: Vec::new(),
            definitions: alloc::vec![Definition::default_definition()],
            lifecycle: HashMap::new(),
            subscribers: SubscriberTable::new(),
            draining: Vec::new(),
            log: None,
            now: 0,
        }
    }

    // ---------------------------------------------------------------------
    // Definitions
    // ---------------------------------------------------------------------

    /// Registers a definition; keys are owned by the first matching pattern
    /// in registration order.
    pub fn define(&mut self, pattern: Vec<PatternPart>) -> DefinitionId {
        self.definitions.push(Definition::new(pattern));
        self.definitions.len() - 1
    }

    /// Registers a reducer for `property` on a definition; subsequent patches
    /// naming that property are routed through it.
    pub fn reduce<F>(&mut self, definition: DefinitionId, property: impl Into<String>, func: F)
    where
        F: Fn(&[Value]) -> Value + 'static,
    {
        let property = property.into();
        self.definitions[definition]
            .reducers
            .insert(property.clone(), Reducer::new(property, Box::new(func)));
    }

    /// Registers a projection rule on a definition and returns its index.
    pub fn map(
        &mut self,
        definition: DefinitionId,
        spec: KeySpec,
        fields: Option<Vec<String>>,
    ) -> usize {
        let rules = &mut self.definitions[definition].rules;
        rules.push(ProjectionRule::new(spec, fields));
        rules.len() - 1
    }

    /// Registers a lifecycle listener for a definition.
    pub fn on_lifecycle<F>(&mut self, definition: DefinitionId, callback: F)
    where
        F: FnMut(Lifecycle, &Key) + 'static,
    {
        self.lifecycle
            .entry(definition)
            .or_default()
            .push(Box::new(callback));
    }

    /// Registers a reducer on the default definition (flat, non-definition
    /// mode) and returns a handle naming the reduced property.
    pub fn create_reduced_field<F>(&mut self, property: impl Into<String>, func: F) -> ReducerField
    where
        F: Fn(&[Value]) -> Value + 'static,
    {
        let property = property.into();
        self.reduce(DEFAULT_DEFINITION, property.clone(), func);
        ReducerField { property }
    }

    fn find_definition(&self, key: &Key) -> DefinitionId {
        self.definitions
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, def)| def.matches(key))
            .map(|(id, _)| id)
            .unwrap_or(DEFAULT_DEFINITION)
    }

    // ---------------------------------------------------------------------
    // Writes
    // ---------------------------------------------------------------------

    /// Sets one plain property.
    pub fn set(&mut self, key: &Key, property: &str, value: Value) -> Result<()> {
        if property.is_empty() {
            return Err(Error::invalid_property(property));
        }
        self.apply(key, alloc::vec![(property.to_string(), Patch::Plain(value))], true)?;
        Ok(())
    }

    /// Merges a patch of property assignments into the record.
    pub fn merge(&mut self, key: &Key, patch: Vec<(String, Patch)>) -> Result<()> {
        if patch.is_empty() {
            return Err(Error::invalid_value("empty patch"));
        }
        for (property, _) in &patch {
            if property.is_empty() {
                return Err(Error::invalid_property(property.clone()));
            }
        }
        self.apply(key, patch, true)?;
        Ok(())
    }

    /// Upserts one reducer contribution for an existing owner record.
    /// Returns whether the contribution changed. Fails with
    /// `OrphanedReducer` when no record exists for `key`; create the owner
    /// first (a `set`/`merge` bootstraps it).
    pub fn contribute(
        &mut self,
        key: &Key,
        property: &str,
        contributor: Key,
        value: Value,
    ) -> Result<bool> {
        key.validate()?;
        if !self.primary.contains(&encode(key)?) {
            return Err(Error::orphaned_reducer(property));
        }
        self.apply(
            key,
            alloc::vec![(property.to_string(), Patch::Reduce { contributor, value })],
            false,
        )
    }

    /// Record deletion is declared but unimplemented in this revision.
    pub fn delete(&mut self, _key: &Key) -> Result<()> {
        Err(Error::unsupported("delete"))
    }

    /// Applies a patch to the record for `key`, creating it when permitted.
    /// Returns whether anything changed.
    fn apply(&mut self, key: &Key, patch: Vec<(String, Patch)>, create: bool) -> Result<bool> {
        key.validate()?;
        let enc = encode(key)?;
        let definition = self.find_definition(key);

        let rid = match self.primary.get(&enc).copied() {
            Some(rid) => {
                // ownership can change when a definition is registered after
                // the record; keep the stored id current so the flush
                // resolves reducers through the same definition as routing
                self.records[rid].definition = definition;
                rid
            }
            None => {
                if !create {
                    let property = patch.first().map(|(p, _)| p.as_str()).unwrap_or_default();
                    return Err(Error::orphaned_reducer(property));
                }
                let props = self.definitions[definition].initial_props(key);
                self.records.push(Record::new(key.clone(), definition, props));
                let rid = self.records.len() - 1;
                self.primary.put(enc.clone(), rid);
                self.emit_lifecycle(definition, Lifecycle::Created, key);
                self.dispatch(ChangeKind::Added, &enc, rid)?;
                rid
            }
        };

        let mut changed_fields: Vec<String> = Vec::new();
        for (property, assignment) in patch {
            if self.definitions[definition].is_reduced(&property) {
                let Patch::Reduce { contributor, value } = assignment else {
                    return Err(Error::invalid_value(
                        "reducer property requires a contribution",
                    ));
                };
                contributor.validate()?;
                if let Some(reducer) = self.definitions[definition].reducers.get_mut(&property) {
                    if reducer.set(key, &contributor, value)? {
                        self.records[rid].mark_dirty(&property);
                        changed_fields.push(property);
                    }
                }
            } else {
                let Patch::Plain(value) = assignment else {
                    return Err(Error::invalid_value("contribution to a plain property"));
                };
                if self.records[rid].props.get(&property) != Some(&value) {
                    self.records[rid].props.insert(property.clone(), value);
                    changed_fields.push(property);
                }
            }
        }

        if changed_fields.is_empty() {
            return Ok(false);
        }
        self.emit_lifecycle(definition, Lifecycle::Changed, key);
        self.run_projections(definition, rid, &changed_fields)?;
        self.dispatch(ChangeKind::Updated, &enc, rid)?;
        Ok(true)
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    /// Point lookup returning the stable record handle.
    pub fn get(&self, key: &Key) -> Result<Option<RecordId>> {
        key.validate()?;
        Ok(self.primary.get(&encode(key)?).copied())
    }

    /// Point lookup returning the property view, flushing pending reducers.
    pub fn get_value(&mut self, key: &Key) -> Result<Option<&PropertyMap>> {
        key.validate()?;
        let enc = encode(key)?;
        match self.primary.get(&enc).copied() {
            Some(rid) => {
                Self::flush_dirty(&self.definitions, &mut self.records, rid, None)?;
                Ok(Some(&self.records[rid].props))
            }
            None => Ok(None),
        }
    }

    /// Returns true if a record exists for `key`.
    pub fn has(&self, key: &Key) -> Result<bool> {
        key.validate()?;
        Ok(self.primary.contains(&encode(key)?))
    }

    /// The property view for a record handle, flushing pending reducers.
    pub fn record_value(&mut self, rid: RecordId) -> Result<&PropertyMap> {
        Self::flush_dirty(&self.definitions, &mut self.records, rid, None)?;
        Ok(&self.records[rid].props)
    }

    /// The key of a record handle.
    pub fn record_key(&self, rid: RecordId) -> &Key {
        self.records[rid].key()
    }

    /// Bounded range read with the defaulting rules of the store crate.
    pub fn get_range(
        &mut self,
        start: Option<&Key>,
        end: Option<&Key>,
        options: RangeOptions,
    ) -> Result<Vec<(Key, PropertyMap)>> {
        let (start_bytes, end_bytes) = range_bounds(start, end)?;
        let limit = options.limit.unwrap_or(usize::MAX);

        let primary = &self.primary;
        let records = &mut self.records;
        let definitions = &self.definitions;
        let mut out: Vec<(Key, PropertyMap)> = Vec::new();
        let mut failure: Option<Error> = None;
        let visit = |enc: &[u8], rid: &RecordId| -> bool {
            if out.len() >= limit {
                return false;
            }
            if let Err(err) = Self::flush_dirty(definitions, records, *rid, None) {
                failure = Some(err);
                return false;
            }
            match decode(enc) {
                Ok(key) => out.push((key, records[*rid].props.clone())),
                Err(err) => {
                    failure = Some(err);
                    return false;
                }
            }
            true
        };
        match options.order {
            Order::Asc => primary.walk_asc(&start_bytes, &end_bytes, visit),
            Order::Desc => primary.walk_desc(&start_bytes, &end_bytes, visit),
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(out),
        }
    }

    // ---------------------------------------------------------------------
    // Subscriptions
    // ---------------------------------------------------------------------

    /// Registers a subscription over `[start, end)` with the usual bound
    /// defaulting rules.
    pub fn subscribe(&mut self, start: Option<&Key>, end: Option<&Key>) -> Result<SubscriptionId> {
        self.emit_log(LogEvent::Subscribe, LogPhase::Enter);
        let (start_bytes, end_bytes) = range_bounds(start, end)?;
        let id = self.subscribers.subscribe(start_bytes, end_bytes);
        self.emit_log(LogEvent::Subscribe, LogPhase::Exit);
        Ok(id)
    }

    /// Registers a synchronous listener for one change kind. Returns false
    /// if the subscription is gone.
    pub fn on<F>(&mut self, subscription: SubscriptionId, kind: ChangeKind, callback: F) -> bool
    where
        F: FnMut(&Key, &PropertyMap) + 'static,
    {
        match self.subscribers.get_mut(subscription) {
            Some(sub) => {
                sub.on(kind, Box::new(callback));
                true
            }
            None => false,
        }
    }

    /// Registers a close listener on a subscription.
    pub fn on_close<F>(&mut self, subscription: SubscriptionId, callback: F) -> bool
    where
        F: FnMut() + 'static,
    {
        match self.subscribers.get_mut(subscription) {
            Some(sub) => {
                sub.on_close(Box::new(callback));
                true
            }
            None => false,
        }
    }

    /// Attaches a batching stream to a subscription.
    pub fn throttle(
        &mut self,
        subscription: SubscriptionId,
        policy: FlushPolicy,
    ) -> Option<StreamId> {
        let sub = self.subscribers.get_mut(subscription)?;
        let index = sub.attach_stream(policy);
        Some(StreamId {
            subscription,
            index,
        })
    }

    /// Registers the batch callback for a stream.
    pub fn on_data<F>(&mut self, stream: StreamId, callback: F) -> bool
    where
        F: FnMut(&[BatchEntry]) + 'static,
    {
        match self
            .subscribers
            .get_mut(stream.subscription)
            .and_then(|sub| sub.stream_mut(stream.index))
        {
            Some(s) => {
                s.set_callback(Box::new(callback));
                true
            }
            None => false,
        }
    }

    /// Closes a subscription: close listeners fire, no future event reaches
    /// it, and any already-armed stream still fires once with what it queued.
    pub fn close(&mut self, subscription: SubscriptionId) -> bool {
        self.emit_log(LogEvent::Unsubscribe, LogPhase::Enter);
        let removed = match self.subscribers.remove(subscription) {
            Some(sub) => {
                self.draining.extend(sub.into_close());
                true
            }
            None => false,
        };
        self.emit_log(LogEvent::Unsubscribe, LogPhase::Exit);
        removed
    }

    /// Installs the observational lifecycle log sink.
    pub fn set_lifecycle_log<F>(&mut self, sink: F)
    where
        F: FnMut(LogEvent, LogPhase) + 'static,
    {
        self.log = Some(Box::new(sink));
    }

    // ---------------------------------------------------------------------
    // Scheduler
    // ---------------------------------------------------------------------

    /// Runs one scheduler turn: fires every armed stream that is due now
    /// (next-turn streams, and delayed streams whose delay has elapsed).
    pub fn tick(&mut self) -> Result<()> {
        self.fire_due()
    }

    /// Advances the logical clock, then runs a scheduler turn.
    pub fn advance(&mut self, ms: u64) -> Result<()> {
        self.now += ms;
        self.fire_due()
    }

    fn fire_due(&mut self) -> Result<()> {
        for id in self.subscribers.ids() {
            let stream_count = match self.subscribers.get_mut(id) {
                Some(sub) => sub.streams_mut().len(),
                None => continue,
            };
            for index in 0..stream_count {
                let due = self
                    .subscribers
                    .get_mut(id)
                    .and_then(|sub| sub.stream_mut(index))
                    .map(|s| s.is_due(self.now))
                    .unwrap_or(false);
                if !due {
                    continue;
                }
                let raw = self
                    .subscribers
                    .get_mut(id)
                    .and_then(|sub| sub.stream_mut(index))
                    .map(|s| s.take())
                    .unwrap_or_default();
                let batch = self.build_batch(raw)?;
                if let Some(cb) = self
                    .subscribers
                    .get_mut(id)
                    .and_then(|sub| sub.stream_mut(index))
                    .and_then(|s| s.callback_mut())
                {
                    cb(&batch);
                }
            }
        }

        // streams surviving a close fire at most once more
        let mut draining = core::mem::take(&mut self.draining);
        let mut kept = Vec::new();
        for mut stream in draining.drain(..) {
            if stream.is_due(self.now) {
                let batch = self.build_batch(stream.take())?;
                if let Some(cb) = stream.callback_mut() {
                    cb(&batch);
                }
            } else {
                kept.push(stream);
            }
        }
        self.draining = kept;
        Ok(())
    }

    fn build_batch(&mut self, raw: Vec<(Vec<u8>, ChangeKind, RecordId)>) -> Result<Vec<BatchEntry>> {
        let mut batch = Vec::with_capacity(raw.len());
        for (enc, kind, rid) in raw {
            let key = decode(&enc)?;
            let value = if kind == ChangeKind::Removed {
                None
            } else {
                Self::flush_dirty(&self.definitions, &mut self.records, rid, None)?;
                Some(self.records[rid].props.clone())
            };
            batch.push(BatchEntry { kind, key, value });
        }
        Ok(batch)
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    /// Recomputes the dirty reducer properties of a record (restricted to
    /// `filter` when given), clearing the marks consumed.
    fn flush_dirty(
        definitions: &[Definition],
        records: &mut [Record],
        rid: RecordId,
        filter: Option<&[String]>,
    ) -> Result<()> {
        let record = &mut records[rid];
        for name in record.take_dirty(filter) {
            if let Some(reducer) = definitions[record.definition].reducers.get(&name) {
                let value = reducer.run(record.key())?;
                record.props.insert(name, value);
            }
        }
        Ok(())
    }

    fn emit_lifecycle(&mut self, definition: DefinitionId, event: Lifecycle, key: &Key) {
        if let Some(callbacks) = self.lifecycle.get_mut(&definition) {
            for cb in callbacks.iter_mut() {
                cb(event, key);
            }
        }
    }

    fn emit_log(&mut self, event: LogEvent, phase: LogPhase) {
        if let Some(sink) = self.log.as_mut() {
            sink(event, phase);
        }
    }

    /// Re-runs every projection rule of the definition against the source
    /// record, then retires anything produced before but not reconfirmed.
    fn run_projections(
        &mut self,
        definition: DefinitionId,
        rid: RecordId,
        changed: &[String],
    ) -> Result<()> {
        let rule_count = self.definitions[definition].rules.len();
        if rule_count == 0 {
            return Ok(());
        }

        // Pass 1: evaluate every rule against the current source state.
        let mut outputs: Vec<(usize, Option<(Vec<u8>, Key, bool, PropertyMap)>)> =
            Vec::with_capacity(rule_count);
        for rule_index in 0..rule_count {
            let flush_filter = self.definitions[definition].rules[rule_index].fields.clone();
            Self::flush_dirty(
                &self.definitions,
                &mut self.records,
                rid,
                flush_filter.as_deref(),
            )?;

            let derived = self.definitions[definition].rules[rule_index]
                .derive(&self.records[rid].props);
            let Some(d) = derived else {
                outputs.push((rule_index, None));
                continue;
            };
            d.key.validate()?;
            let enc = encode(&d.key)?;
            let refresh = match &d.fields {
                None => true,
                Some(fields) => fields.iter().any(|f| changed.iter().any(|c| c == f)),
            };
            let value = materialize(&self.records[rid].props, d.fields.as_deref());
            outputs.push((rule_index, Some((enc, d.key, refresh, value))));
        }

        // Pass 2: materialize, update or reconfirm each derived record.
        let previous = core::mem::take(&mut self.records[rid].produced);
        let mut produced: Vec<(usize, Vec<u8>)> = Vec::new();
        for (rule_index, output) in outputs {
            let Some((enc, key, refresh, value)) = output else {
                continue;
            };
            match self.primary.get(&enc).copied() {
                Some(drid) => {
                    // only a record this rule produced last round is ours to
                    // update; a directly written record at the same key is
                    // left untouched and never retired
                    let reconfirmed = previous
                        .iter()
                        .any(|(r, e)| *r == rule_index && *e == enc);
                    if !reconfirmed {
                        continue;
                    }
                    if refresh {
                        self.records[drid].props = value;
                        self.dispatch(ChangeKind::Updated, &enc, drid)?;
                    }
                }
                None => {
                    let derived_def = self.find_definition(&key);
                    self.records.push(Record::new(key.clone(), derived_def, value));
                    let drid = self.records.len() - 1;
                    self.primary.put(enc.clone(), drid);
                    self.emit_lifecycle(derived_def, Lifecycle::Created, &key);
                    self.dispatch(ChangeKind::Added, &enc, drid)?;
                }
            }
            produced.push((rule_index, enc));
        }

        // Pass 3: fully retract derived records no rule reconfirmed.
        for (_, stale_enc) in previous {
            if produced.iter().any(|(_, e)| *e == stale_enc) {
                continue;
            }
            if let Some(drid) = self.primary.delete(&stale_enc) {
                self.dispatch(ChangeKind::Removed, &stale_enc, drid)?;
            }
        }
        self.records[rid].produced = produced;
        Ok(())
    }

    /// Forwards one event to every covering subscription: sync listeners
    /// fire immediately with the flushed value, batch streams queue it.
    fn dispatch(&mut self, kind: ChangeKind, enc_key: &[u8], rid: RecordId) -> Result<()> {
        let covering = self.subscribers.ids_covering(enc_key);
        if covering.is_empty() {
            return Ok(());
        }
        Self::flush_dirty(&self.definitions, &mut self.records, rid, None)?;
        let key = decode(enc_key)?;
        for id in covering {
            // a listener of an earlier subscription may have closed this one
            let Some(sub) = self.subscribers.get_mut(id) else {
                continue;
            };
            let value = &self.records[rid].props;
            for cb in sub.listeners_for(kind) {
                cb(&key, value);
            }
            for stream in sub.streams_mut() {
                stream.enqueue(self.now, kind, enc_key, rid);
            }
        }
        Ok(())
    }
}
