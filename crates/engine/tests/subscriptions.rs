//! Subscription fan-out, close semantics and batch stream scheduling.

use std::cell::RefCell;
use std::rc::Rc;

use ordex_engine::{
    BatchEntry, ChangeKind, FlushPolicy, Indexer, Key, LogEvent, LogPhase, Value,
};

fn k(name: &str) -> Key {
    Key::text(name)
}

fn t2(a: &str, b: f64) -> Key {
    Key::tuple(vec![Key::text(a), Key::number(b)])
}

#[test]
fn test_listeners_fire_for_covered_keys_only() {
    let mut idx = Indexer::new();
    let start = Key::tuple(vec![Key::text("foo")]);
    let sub = idx.subscribe(Some(&start), None).unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = seen.clone();
    idx.on(sub, ChangeKind::Added, move |key, _props| {
        log.borrow_mut().push(key.clone());
    });

    idx.set(&t2("foo", 1.0), "w", Value::number(1.0)).unwrap();
    idx.set(&t2("fop", 1.0), "w", Value::number(2.0)).unwrap();
    idx.set(&t2("foo", 2.0), "w", Value::number(3.0)).unwrap();

    assert_eq!(*seen.borrow(), vec![t2("foo", 1.0), t2("foo", 2.0)]);
}

#[test]
fn test_creation_dispatches_added_then_updated() {
    let mut idx = Indexer::new();
    let sub = idx.subscribe(None, None).unwrap();

    let order = Rc::new(RefCell::new(Vec::new()));
    let a = order.clone();
    idx.on(sub, ChangeKind::Added, move |_key, props| {
        a.borrow_mut().push((ChangeKind::Added, props.len()));
    });
    let u = order.clone();
    idx.on(sub, ChangeKind::Updated, move |_key, props| {
        u.borrow_mut().push((ChangeKind::Updated, props.len()));
    });

    idx.set(&k("foo"), "w", Value::number(1.0)).unwrap();
    // Added fires on the bare record, Updated after the patch landed
    assert_eq!(
        *order.borrow(),
        vec![(ChangeKind::Added, 0), (ChangeKind::Updated, 1)]
    );
}

#[test]
fn test_identical_write_dispatches_nothing() {
    let mut idx = Indexer::new();
    let sub = idx.subscribe(None, None).unwrap();
    let count = Rc::new(RefCell::new(0u32));
    let c = count.clone();
    idx.on(sub, ChangeKind::Updated, move |_key, _props| {
        *c.borrow_mut() += 1;
    });

    idx.set(&k("foo"), "w", Value::number(1.0)).unwrap();
    idx.set(&k("foo"), "w", Value::number(1.0)).unwrap();
    assert_eq!(*count.borrow(), 1);
}

#[test]
fn test_close_stops_delivery_and_fires_close_listeners() {
    let mut idx = Indexer::new();
    let sub = idx.subscribe(None, None).unwrap();

    let events = Rc::new(RefCell::new(0u32));
    let e = events.clone();
    idx.on(sub, ChangeKind::Added, move |_key, _props| {
        *e.borrow_mut() += 1;
    });
    let closed = Rc::new(RefCell::new(0u32));
    let c = closed.clone();
    idx.on_close(sub, move || {
        *c.borrow_mut() += 1;
    });

    idx.set(&k("a"), "w", Value::number(1.0)).unwrap();
    assert!(idx.close(sub));
    idx.set(&k("b"), "w", Value::number(1.0)).unwrap();

    assert_eq!(*events.borrow(), 1);
    assert_eq!(*closed.borrow(), 1);
    assert!(!idx.close(sub));
    assert!(!idx.on_close(sub, || {}));
}

#[test]
fn test_next_turn_stream_coalesces_per_key() {
    let mut idx = Indexer::new();
    let sub = idx.subscribe(None, None).unwrap();
    let stream = idx.throttle(sub, FlushPolicy::NextTurn).unwrap();

    let batches: Rc<RefCell<Vec<Vec<BatchEntry>>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = batches.clone();
    idx.on_data(stream, move |batch: &[BatchEntry]| {
        sink.borrow_mut().push(batch.to_vec());
    });

    idx.set(&k("foo"), "w", Value::number(1.0)).unwrap();
    idx.set(&k("foo"), "w", Value::number(2.0)).unwrap();
    idx.set(&k("bar"), "w", Value::number(3.0)).unwrap();
    idx.tick().unwrap();

    let batches = batches.borrow();
    assert_eq!(batches.len(), 1);
    let batch = &batches[0];
    assert_eq!(batch.len(), 2);
    // ascending key order: bar before foo
    assert_eq!(batch[0].key, k("bar"));
    assert_eq!(batch[1].key, k("foo"));
    // add then update escalates to add, payload is the latest state
    assert_eq!(batch[1].kind, ChangeKind::Added);
    let value = batch[1].value.as_ref().unwrap();
    assert_eq!(value.get("w"), Some(&Value::number(2.0)));
}

#[test]
fn test_idle_stream_does_not_fire() {
    let mut idx = Indexer::new();
    let sub = idx.subscribe(None, None).unwrap();
    let stream = idx.throttle(sub, FlushPolicy::NextTurn).unwrap();

    let fired = Rc::new(RefCell::new(0u32));
    let f = fired.clone();
    idx.on_data(stream, move |_batch: &[BatchEntry]| {
        *f.borrow_mut() += 1;
    });

    idx.tick().unwrap();
    assert_eq!(*fired.borrow(), 0);

    idx.set(&k("foo"), "w", Value::number(1.0)).unwrap();
    idx.tick().unwrap();
    idx.tick().unwrap();
    assert_eq!(*fired.borrow(), 1);
}

#[test]
fn test_delayed_stream_waits_for_its_window() {
    let mut idx = Indexer::new();
    let sub = idx.subscribe(None, None).unwrap();
    let stream = idx.throttle(sub, FlushPolicy::Delay(100)).unwrap();

    let fired = Rc::new(RefCell::new(0u32));
    let f = fired.clone();
    idx.on_data(stream, move |_batch: &[BatchEntry]| {
        *f.borrow_mut() += 1;
    });

    idx.set(&k("foo"), "w", Value::number(1.0)).unwrap();
    idx.advance(50).unwrap();
    assert_eq!(*fired.borrow(), 0);

    // changes inside the window keep coalescing without pushing the deadline
    idx.set(&k("foo"), "w", Value::number(2.0)).unwrap();
    idx.advance(50).unwrap();
    assert_eq!(*fired.borrow(), 1);
}

#[test]
fn test_armed_stream_survives_close_for_one_flush() {
    let mut idx = Indexer::new();
    let sub = idx.subscribe(None, None).unwrap();
    let stream = idx.throttle(sub, FlushPolicy::NextTurn).unwrap();

    let batches: Rc<RefCell<Vec<usize>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = batches.clone();
    idx.on_data(stream, move |batch: &[BatchEntry]| {
        sink.borrow_mut().push(batch.len());
    });

    idx.set(&k("foo"), "w", Value::number(1.0)).unwrap();
    idx.close(sub);
    idx.tick().unwrap();
    idx.tick().unwrap();

    assert_eq!(*batches.borrow(), vec![1]);
}

#[test]
fn test_removed_batch_entries_carry_no_value() {
    use ordex_engine::{KeySpec, PatternPart};

    let mut idx = Indexer::new();
    let def = idx.define(vec![
        PatternPart::Literal(Key::text("item")),
        PatternPart::Param(String::from("id")),
    ]);
    idx.map(
        def,
        KeySpec::With(Box::new(|props| {
            let bucket = props.get("bucket")?.as_text()?;
            Some(ordex_engine::Derived::new(Key::tuple(vec![
                Key::text("bybucket"),
                Key::text(bucket),
            ])))
        })),
        None,
    );

    let start = Key::tuple(vec![Key::text("bybucket")]);
    let sub = idx.subscribe(Some(&start), None).unwrap();
    let stream = idx.throttle(sub, FlushPolicy::NextTurn).unwrap();
    let batches: Rc<RefCell<Vec<Vec<BatchEntry>>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = batches.clone();
    idx.on_data(stream, move |batch: &[BatchEntry]| {
        sink.borrow_mut().push(batch.to_vec());
    });

    idx.set(&t2("item", 1.0), "bucket", Value::text("a")).unwrap();
    idx.tick().unwrap();
    idx.set(&t2("item", 1.0), "bucket", Value::text("b")).unwrap();
    idx.tick().unwrap();

    let batches = batches.borrow();
    assert_eq!(batches.len(), 2);
    let second = &batches[1];
    let removed = second
        .iter()
        .find(|entry| entry.kind == ChangeKind::Removed)
        .unwrap();
    assert_eq!(
        removed.key,
        Key::tuple(vec![Key::text("bybucket"), Key::text("a")])
    );
    assert!(removed.value.is_none());
    assert!(second
        .iter()
        .any(|entry| entry.kind == ChangeKind::Added
            && entry.key == Key::tuple(vec![Key::text("bybucket"), Key::text("b")])));
}

#[test]
fn test_lifecycle_log_brackets_subscribe_and_close() {
    let mut idx = Indexer::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();
    idx.set_lifecycle_log(move |event, phase| {
        sink.borrow_mut().push((event, phase));
    });

    let sub = idx.subscribe(None, None).unwrap();
    idx.close(sub);

    assert_eq!(
        *log.borrow(),
        vec![
            (LogEvent::Subscribe, LogPhase::Enter),
            (LogEvent::Subscribe, LogPhase::Exit),
            (LogEvent::Unsubscribe, LogPhase::Enter),
            (LogEvent::Unsubscribe, LogPhase::Exit),
        ]
    );
}
