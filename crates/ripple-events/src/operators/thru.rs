//! Per-event transformation.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ripple_supply::Supply;
use tracing::trace;

use crate::combinators::on_never;
use crate::on_event::OnEvent;
use crate::receiver::{EventContext, EventReceiver};

/// Verdict of a pass function for one incoming event.
pub enum Pass<F> {
    /// Forward one event downstream.
    Continue(F),
    /// Forward each of the events downstream, in order.
    Many(Vec<F>),
    /// Forward nothing.
    Skip,
    /// Subscribe to a nested registrar and forward its events until it
    /// ends or the next redirect arrives.
    Redirect(OnEvent<F>),
}

impl<F> fmt::Debug for Pass<F>
where
    F: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continue(event) => f.debug_tuple("Continue").field(event).finish(),
            Self::Many(events) => f.debug_tuple("Many").field(events).finish(),
            Self::Skip => f.write_str("Skip"),
            Self::Redirect(_) => f.write_str("Redirect(..)"),
        }
    }
}

type PassFn<E, F> = Rc<dyn Fn(&E) -> Pass<F>>;

/// Transform each event with a pass function.
///
/// The upstream registration shares the downstream receiver's supply, so a
/// cutoff on either side ends both. Recurrent handlers registered downstream
/// receive upstream recurrent events transformed by the same pass.
///
/// A [`Pass::Redirect`] cuts off the previous nested subscription before
/// subscribing to the new one. A nested registrar ending on its own does not
/// end the outer stream.
pub fn thru<E, F, P>(pass: P) -> impl FnOnce(&OnEvent<E>) -> OnEvent<F>
where
    E: 'static,
    F: 'static,
    P: Fn(&E) -> Pass<F> + 'static,
{
    move |source| {
        let source = source.clone();
        let pass: PassFn<E, F> = Rc::new(pass);

        OnEvent::new(move |downstream: EventReceiver<F>| {
            let supply = downstream.supply().clone();
            let forwarder = Rc::new(Forwarder {
                pass: Rc::clone(&pass),
                downstream,
                nested: RefCell::new(None),
            });

            source.register(EventReceiver::with_supply(
                supply,
                move |context, event| forwarder.forward(context, event),
            ))
        })
    }
}

/// Convert each event.
pub fn map<E, F, M>(convert: M) -> impl FnOnce(&OnEvent<E>) -> OnEvent<F>
where
    E: 'static,
    F: 'static,
    M: Fn(&E) -> F + 'static,
{
    thru(move |event| Pass::Continue(convert(event)))
}

/// Follow the nested registrar extracted from each event.
///
/// Only the registrar extracted from the latest event is followed. `None`
/// cuts off the previous nested subscription without starting a new one.
pub fn dig<E, F, X>(extract: X) -> impl FnOnce(&OnEvent<E>) -> OnEvent<F>
where
    E: 'static,
    F: 'static,
    X: Fn(&E) -> Option<OnEvent<F>> + 'static,
{
    thru(move |event| Pass::Redirect(extract(event).unwrap_or_else(on_never)))
}

struct Forwarder<E, F> {
    pass: PassFn<E, F>,
    downstream: EventReceiver<F>,
    nested: RefCell<Option<Supply>>,
}

impl<E: 'static, F: 'static> Forwarder<E, F> {
    fn forward(self: &Rc<Self>, context: &EventContext<E>, event: &E) {
        match (self.pass)(event) {
            Pass::Continue(next) => {
                self.downstream.receive(&self.context(context), &next);
            },
            Pass::Many(events) => {
                let context = self.context(context);
                for next in &events {
                    if self.downstream.supply().is_off() {
                        break;
                    }
                    self.downstream.receive(&context, next);
                }
            },
            Pass::Skip => {},
            Pass::Redirect(nested) => self.redirect(&nested),
        }
    }

    fn context(self: &Rc<Self>, upstream: &EventContext<E>) -> EventContext<F> {
        let forwarder = Rc::downgrade(self);
        upstream.map(move |event: &E, emit: &dyn Fn(&F)| {
            let Some(forwarder) = forwarder.upgrade() else {
                return;
            };
            match (forwarder.pass)(event) {
                Pass::Continue(next) => emit(&next),
                Pass::Many(events) => {
                    for next in &events {
                        emit(next);
                    }
                },
                Pass::Skip => {},
                Pass::Redirect(nested) => forwarder.redirect(&nested),
            }
        })
    }

    fn redirect(&self, nested: &OnEvent<F>) {
        let previous = self.nested.borrow_mut().take();
        if let Some(previous) = previous {
            trace!("Cutting off previous nested registration");
            previous.done();
        }
        if self.downstream.supply().is_off() {
            return;
        }

        let supply = self.downstream.supply().derive();
        *self.nested.borrow_mut() = Some(supply.clone());

        let downstream = self.downstream.clone();
        nested.register(EventReceiver::with_supply(supply, move |context, event| {
            downstream.receive(context, event);
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::EventNotifier;

    fn collect<E: Clone + 'static>(on_event: &OnEvent<E>) -> (Supply, Rc<RefCell<Vec<E>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let supply = on_event.on(move |event: &E| sink.borrow_mut().push(event.clone()));
        (supply, seen)
    }

    #[test]
    fn test_map_converts_events() {
        let notifier = EventNotifier::new();
        let (_supply, seen) = collect(&notifier.on_event().map(|n: &u32| n.to_string()));

        notifier.send(1);
        notifier.send(2);

        assert_eq!(*seen.borrow(), vec!["1", "2"]);
    }

    #[test]
    fn test_thru_verdicts() {
        let notifier = EventNotifier::new();
        let transformed = notifier.on_event().thru(|n: &u32| match n {
            0 => Pass::Skip,
            1 => Pass::Continue(10),
            _ => Pass::Many(vec![20, 21]),
        });
        let (_supply, seen) = collect(&transformed);

        notifier.send(0);
        notifier.send(1);
        notifier.send(2);

        assert_eq!(*seen.borrow(), vec![10, 20, 21]);
    }

    #[test]
    fn test_downstream_cutoff_removes_upstream_registration() {
        let notifier = EventNotifier::<u32>::new();
        let (supply, _seen) = collect(&notifier.on_event().map(|n: &u32| *n));
        assert_eq!(notifier.size(), 1);

        supply.done();
        assert_eq!(notifier.size(), 0);
    }

    #[test]
    fn test_upstream_cutoff_reaches_downstream() {
        let notifier = EventNotifier::<u32>::new();
        let (supply, _seen) = collect(&notifier.on_event().map(|n: &u32| *n));

        notifier.done();
        assert!(supply.is_off());
    }

    #[test]
    fn test_dig_last_nested_wins() {
        let outer = EventNotifier::<u8>::new();
        let first = EventNotifier::<&'static str>::new();
        let second = EventNotifier::<&'static str>::new();

        let (first_source, second_source) = (first.on_event(), second.on_event());
        let dug = outer.on_event().dig(move |n: &u8| match n {
            1 => Some(first_source.clone()),
            2 => Some(second_source.clone()),
            _ => None,
        });
        let (supply, seen) = collect(&dug);

        outer.send(1);
        first.send("a");
        outer.send(2);
        first.send("b");
        second.send("c");
        assert_eq!(first.size(), 0);

        outer.send(0);
        second.send("d");
        assert_eq!(second.size(), 0);
        assert!(!supply.is_off());

        assert_eq!(*seen.borrow(), vec!["a", "c"]);
    }

    #[test]
    fn test_nested_end_keeps_outer_stream() {
        let outer = EventNotifier::<u8>::new();
        let nested = EventNotifier::<u8>::new();
        let source = nested.on_event();
        let (supply, seen) = collect(&outer.on_event().dig(move |_: &u8| Some(source.clone())));

        outer.send(1);
        nested.send(5);
        nested.done();

        assert!(!supply.is_off());
        assert_eq!(*seen.borrow(), vec![5]);
    }

    #[test]
    fn test_downstream_cutoff_ends_nested_registration() {
        let outer = EventNotifier::<u8>::new();
        let nested = EventNotifier::<u8>::new();
        let source = nested.on_event();
        let (supply, _seen) = collect(&outer.on_event().dig(move |_: &u8| Some(source.clone())));

        outer.send(1);
        assert_eq!(nested.size(), 1);

        supply.done();
        assert_eq!(nested.size(), 0);
        assert_eq!(outer.size(), 0);
    }

    #[test]
    fn test_recurrent_events_pass_through_map() {
        let notifier = EventNotifier::<u32>::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sender = notifier.clone();
        let sink = Rc::clone(&seen);
        notifier
            .on_event()
            .map(|n: &u32| n.saturating_mul(10))
            .register(EventReceiver::new(move |context, event: &u32| {
                sink.borrow_mut().push(format!("receive {event}"));
                let recurrent = Rc::clone(&sink);
                context.after_recurrent(move |event: &u32| {
                    recurrent.borrow_mut().push(format!("recurrent {event}"));
                });
                if *event < 20 {
                    sender.send(2);
                }
            }));

        notifier.send(1);

        assert_eq!(*seen.borrow(), vec!["receive 10", "recurrent 20"]);
    }

    #[test]
    fn test_pass_panic_propagates() {
        let notifier = EventNotifier::<u32>::new();
        notifier
            .on_event()
            .map(|n: &u32| {
                assert_ne!(*n, 0, "zero");
                *n
            })
            .to(|_| {});

        let outcome =
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| notifier.send(0)));
        assert!(outcome.is_err());
    }
}
