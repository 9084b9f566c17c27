//! Operator chains, sharing and fan-in.

use std::cell::Cell;
use std::rc::Rc;

use ripple_events::operators;
use ripple_events::prelude::*;
use ripple_test::{OffRecord, Recorder};

/// A cold source registering on `notifier`, counting registrations and
/// active registrations.
fn cold_source(notifier: &EventNotifier<u32>) -> (OnEvent<u32>, Rc<Cell<u32>>, Rc<Cell<u32>>) {
    let started = Rc::new(Cell::new(0_u32));
    let active = Rc::new(Cell::new(0_u32));
    let (starts, running) = (Rc::clone(&started), Rc::clone(&active));
    let inner = notifier.on_event();

    let source = OnEvent::new(move |receiver: EventReceiver<u32>| {
        starts.set(starts.get().saturating_add(1));
        running.set(running.get().saturating_add(1));
        let running = Rc::clone(&running);
        receiver
            .supply()
            .when_off(move |_| running.set(running.get().saturating_sub(1)));
        inner.register(receiver)
    });
    (source, started, active)
}

#[test]
fn test_share_runs_side_effect_once() {
    let notifier = EventNotifier::new();
    let (source, started, active) = cold_source(&notifier);
    let shared = source.share();

    let recorders: Vec<Recorder<u32>> = (0..3).map(|_| Recorder::new()).collect();
    let supplies: Vec<Supply> = recorders
        .iter()
        .map(|recorder| shared.on(recorder.receive()))
        .collect();

    assert_eq!(started.get(), 1);
    notifier.send(42);
    for recorder in &recorders {
        assert_eq!(recorder.events(), [42]);
    }

    let (last, rest) = supplies.split_last().unwrap();
    for supply in rest {
        supply.done();
        assert_eq!(active.get(), 1);
    }
    last.done();
    assert_eq!(active.get(), 0);
    assert_eq!(notifier.size(), 0);
}

#[test]
fn test_cold_source_without_share_runs_per_receiver() {
    let notifier = EventNotifier::<u32>::new();
    let (source, started, _active) = cold_source(&notifier);

    source.on(|_| {});
    source.on(|_| {});

    assert_eq!(started.get(), 2);
}

#[test]
fn test_on_any_cuts_off_after_every_source() {
    let first = EventNotifier::<u32>::new();
    let second = EventNotifier::<u32>::new();
    let recorder = Recorder::new();
    let record = OffRecord::new();

    let supply = on_any([first.on_event(), second.on_event()]).on(recorder.receive());
    record.watch(&supply);

    first.send(1);
    first.done();
    second.send(2);
    assert!(!supply.is_off());

    let reason = OffReason::msg("second source closed");
    second.off(reason.clone());

    assert_eq!(recorder.events(), [1, 2]);
    assert_eq!(record.reasons(), vec![reason]);
}

#[test]
fn test_chain_of_operators() {
    let notifier = EventNotifier::new();
    let recorder = Recorder::new();
    let session = Supply::new();

    let supply = notifier
        .on_event()
        .pipe(operators::filter(|n: &i64| *n >= 0))
        .pipe(operators::map(|n: &i64| n.saturating_mul(2)))
        .pipe(operators::thru(|n: &i64| {
            if *n > 10 {
                Pass::Many(vec![*n, n.saturating_add(1)])
            } else {
                Pass::Continue(*n)
            }
        }))
        .pipe(operators::supply_on(&session))
        .on(recorder.receive());

    notifier.send(-1);
    notifier.send(3);
    notifier.send(6);
    session.done();
    notifier.send(1);

    assert_eq!(recorder.events(), [6, 12, 13]);
    assert!(supply.is_off());
    assert_eq!(notifier.size(), 0);
}

#[test]
fn test_dig_follows_latest_nested_source() {
    let selector = EventNotifier::<usize>::new();
    let channels: Vec<EventNotifier<&'static str>> =
        (0..2).map(|_| EventNotifier::new()).collect();
    let recorder = Recorder::new();

    let sources: Vec<OnEvent<&'static str>> =
        channels.iter().map(EventNotifier::on_event).collect();
    selector
        .on_event()
        .dig(move |index: &usize| sources.get(*index).cloned())
        .on(recorder.receive());

    selector.send(0);
    channels[0].send("zero");
    selector.send(1);
    channels[0].send("stale");
    channels[1].send("one");
    selector.send(9);
    channels[1].send("detached");

    assert_eq!(recorder.events(), ["zero", "one"]);
    assert!(channels.iter().all(|channel| channel.size() == 0));
}

#[test]
fn test_after_event_keeps_latest() {
    let notifier = EventNotifier::new();
    let keeper = AfterEvent::new(&notifier.on_event());

    assert!(matches!(
        keeper.on(|_: &&str| {}),
        Err(EventError::NoEvent)
    ));

    let first = Recorder::new();
    let supply = keeper.on_event().on(first.receive());
    assert!(supply.is_off());

    let keeper = AfterEvent::with_fallback(&notifier.on_event(), || "initial");
    let _first = keeper.on(first.receive()).unwrap();
    notifier.send("updated");

    let second = Recorder::new();
    keeper.on(second.receive()).unwrap();

    assert_eq!(first.events(), ["initial", "updated"]);
    assert_eq!(second.events(), ["updated"]);
}
