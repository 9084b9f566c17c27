//! Registrar remembering the last event.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use ripple_supply::{OffReason, Supply};

use crate::error::{EventError, EventResult};
use crate::on_event::OnEvent;
use crate::receiver::{EventContext, EventReceiver};
use crate::sender::EventSupplier;

type FallbackFn<E> = Rc<dyn Fn() -> E>;

/// A shared registrar that keeps the last event and hands it to every new
/// receiver.
///
/// The source is registered once while at least one receiver is active (see
/// [`share`](crate::operators::share)). A new receiver immediately gets the
/// last event seen, or the fallback when nothing was seen yet. Registering
/// when there is neither fails with [`EventError::NoEvent`].
pub struct AfterEvent<E> {
    on_event: OnEvent<E>,
    last: Rc<RefCell<Option<E>>>,
    fallback: Option<FallbackFn<E>>,
}

impl<E: Clone + 'static> AfterEvent<E> {
    /// Keep the events of `source`.
    #[must_use]
    pub fn new(source: &OnEvent<E>) -> Self {
        Self::build(source, None)
    }

    /// Keep the events of `source`, using `fallback` until the first one
    /// arrives.
    #[must_use]
    pub fn with_fallback<D>(source: &OnEvent<E>, fallback: D) -> Self
    where
        D: Fn() -> E + 'static,
    {
        Self::build(source, Some(Rc::new(fallback)))
    }

    fn build(source: &OnEvent<E>, fallback: Option<FallbackFn<E>>) -> Self {
        let last: Rc<RefCell<Option<E>>> = Rc::default();
        let keeper = Rc::clone(&last);
        let source = source.clone();

        let tracked = OnEvent::new(move |receiver: EventReceiver<E>| {
            let keeper = Rc::clone(&keeper);
            let supply = receiver.supply().clone();
            source.register(EventReceiver::with_supply(supply, move |context, event: &E| {
                *keeper.borrow_mut() = Some(event.clone());
                receiver.receive(context, event);
            }))
        });

        Self {
            on_event: tracked.share(),
            last,
            fallback,
        }
    }

    /// The last event, or the fallback if no event was seen yet.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::NoEvent`] when there is neither.
    pub fn last(&self) -> EventResult<E> {
        let last = self.last.borrow().clone();
        last.or_else(|| self.fallback.as_ref().map(|fallback| fallback()))
            .ok_or(EventError::NoEvent)
    }

    /// Register a receiver.
    ///
    /// Unless the source delivers an event while registering, the receiver
    /// is called right away with [`last`](Self::last).
    ///
    /// # Errors
    ///
    /// Returns [`EventError::NoEvent`] when there is no event to deliver.
    /// The receiver's supply is cut off with the same error.
    pub fn register(&self, receiver: EventReceiver<E>) -> EventResult<Supply> {
        let received = Rc::new(Cell::new(false));
        let flag = Rc::clone(&received);
        let target = receiver.clone();

        let supply = self.on_event.register(EventReceiver::with_supply(
            receiver.supply().clone(),
            move |context, event| {
                flag.set(true);
                target.receive(context, event);
            },
        ));
        if received.get() || supply.is_off() {
            return Ok(supply);
        }

        match self.last() {
            Ok(event) => {
                receiver.receive(&EventContext::detached(), &event);
                Ok(supply)
            },
            Err(error) => {
                supply.off(OffReason::failed(EventError::NoEvent));
                Err(error)
            },
        }
    }

    /// Register a receive function.
    ///
    /// # Errors
    ///
    /// See [`register`](Self::register).
    pub fn on<R>(&self, receive: R) -> EventResult<Supply>
    where
        R: Fn(&E) + 'static,
    {
        self.register(EventReceiver::from_fn(receive))
    }

    /// A registrar delivering the kept event on registration.
    ///
    /// Registration errors are reported through the returned supply only.
    #[must_use]
    pub fn on_event(&self) -> OnEvent<E> {
        let keeper = self.clone();
        OnEvent::new(move |receiver: EventReceiver<E>| {
            let supply = receiver.supply().clone();
            keeper.register(receiver).unwrap_or(supply)
        })
    }
}

impl<E> Clone for AfterEvent<E> {
    fn clone(&self) -> Self {
        Self {
            on_event: self.on_event.clone(),
            last: Rc::clone(&self.last),
            fallback: self.fallback.clone(),
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for AfterEvent<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AfterEvent")
            .field("last", &self.last.try_borrow().ok())
            .field("fallback", &self.fallback.is_some())
            .finish_non_exhaustive()
    }
}

impl<E: Clone + 'static> EventSupplier<E> for AfterEvent<E> {
    fn on_event(&self) -> OnEvent<E> {
        AfterEvent::on_event(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::EventNotifier;

    fn recorder() -> (Rc<RefCell<Vec<u32>>>, impl Fn(&u32) + 'static) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        (seen, move |n: &u32| sink.borrow_mut().push(*n))
    }

    #[test]
    fn test_no_event_error() {
        let notifier = EventNotifier::<u32>::new();
        let keeper = AfterEvent::new(&notifier.on_event());

        assert!(matches!(keeper.last(), Err(EventError::NoEvent)));

        let receiver = EventReceiver::from_fn(|_: &u32| {});
        let supply = receiver.supply().clone();
        let result = keeper.register(receiver);

        assert!(matches!(result, Err(EventError::NoEvent)));
        assert!(matches!(
            supply.reason().and_then(|reason| reason.downcast_ref::<EventError>().map(ToString::to_string)),
            Some(message) if message == "no events to send"
        ));
        assert_eq!(notifier.size(), 0);
    }

    #[test]
    fn test_fallback_delivered_on_registration() {
        let notifier = EventNotifier::new();
        let keeper = AfterEvent::with_fallback(&notifier.on_event(), || 0);

        let (seen, receive) = recorder();
        keeper.on(receive).unwrap();
        notifier.send(5);

        assert_eq!(*seen.borrow(), vec![0, 5]);
        assert_eq!(keeper.last().unwrap(), 5);
    }

    #[test]
    fn test_late_receiver_gets_last_event() {
        let notifier = EventNotifier::new();
        let keeper = AfterEvent::with_fallback(&notifier.on_event(), || 0);
        let (_first, receive) = recorder();
        let _supply = keeper.on(receive).unwrap();

        notifier.send(3);
        notifier.send(4);

        let (seen, receive) = recorder();
        keeper.on(receive).unwrap();
        notifier.send(6);

        assert_eq!(*seen.borrow(), vec![4, 6]);
        assert_eq!(notifier.size(), 1);
    }

    #[test]
    fn test_event_sent_during_registration_is_not_duplicated() {
        let source = OnEvent::new(|receiver: EventReceiver<u32>| {
            receiver.receive(&EventContext::detached(), &7);
            receiver.supply().clone()
        });
        let keeper = AfterEvent::new(&source);

        let (seen, receive) = recorder();
        keeper.on(receive).unwrap();

        assert_eq!(*seen.borrow(), vec![7]);
    }

    #[test]
    fn test_on_event_registrar_reports_through_supply() {
        let notifier = EventNotifier::<u32>::new();
        let keeper = AfterEvent::new(&notifier.on_event());

        let supply = keeper.on_event().on(|_| {});
        assert!(supply.is_off());
    }
}
