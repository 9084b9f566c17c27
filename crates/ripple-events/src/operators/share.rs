//! Cold-to-hot sharing of a registrar.

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use ripple_supply::{OffReason, Supply, panic_message};
use tracing::{debug, warn};

use crate::error::EventError;
use crate::notifier::EventNotifier;
use crate::on_event::OnEvent;
use crate::receiver::EventReceiver;

/// Share one upstream registration among all receivers.
///
/// The first receiver registers upstream once; later receivers attach to a
/// shared notifier without registering upstream again. The upstream
/// registration is cut off when the last receiver goes off. When the
/// upstream ends, every current receiver is cut off with its reason and the
/// next receiver starts over.
///
/// If the upstream panics while registering, every current receiver is cut
/// off with [`EventError::SourcePanicked`] and the panic is resumed.
pub fn share<E: Clone + 'static>() -> impl FnOnce(&OnEvent<E>) -> OnEvent<E> {
    |source| {
        let shared = Rc::new(Shared {
            source: source.clone(),
            hub: RefCell::new(None),
        });
        OnEvent::new(move |receiver| shared.register(receiver))
    }
}

/// The shared notifier and its upstream registration.
struct Hub<E> {
    notifier: EventNotifier<E>,
    upstream: Supply,
}

struct Shared<E> {
    source: OnEvent<E>,
    hub: RefCell<Option<Hub<E>>>,
}

impl<E: Clone + 'static> Shared<E> {
    fn register(self: &Rc<Self>, receiver: EventReceiver<E>) -> Supply {
        let existing = self.hub.borrow().as_ref().map(|hub| hub.notifier.clone());
        let (notifier, start) = match existing {
            Some(notifier) => (notifier, false),
            None => (EventNotifier::new(), true),
        };

        let supply = notifier.register(receiver);
        if supply.is_off() {
            return supply;
        }

        let shared = Rc::downgrade(self);
        let watched = notifier.clone();
        supply.when_off(move |_| {
            if let Some(shared) = shared.upgrade() {
                shared.release(&watched);
            }
        });

        if start {
            self.start(notifier);
        }
        supply
    }

    fn start(self: &Rc<Self>, notifier: EventNotifier<E>) {
        let upstream = Supply::new();
        *self.hub.borrow_mut() = Some(Hub {
            notifier: notifier.clone(),
            upstream: upstream.clone(),
        });
        debug!("Starting shared upstream registration");

        let shared = Rc::downgrade(self);
        let downstream = notifier.clone();
        upstream.when_off(move |reason| {
            if let Some(shared) = shared.upgrade() {
                shared.detach(&downstream);
            }
            downstream.off(reason.clone());
        });

        let receiver = EventReceiver::with_supply(upstream.clone(), move |context, event: &E| {
            notifier.relay(context, event.clone());
        });

        let source = &self.source;
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| source.register(receiver))) {
            let message = panic_message(&*payload);
            warn!(%message, "Shared source panicked while registering");
            upstream.off(OffReason::failed(EventError::SourcePanicked { message }));
            panic::resume_unwind(payload);
        }
    }

    /// Tear the upstream down once the last receiver of `notifier` is gone.
    fn release(&self, notifier: &EventNotifier<E>) {
        if notifier.size() > 0 {
            return;
        }
        let hub = self.take_hub(notifier);
        if let Some(hub) = hub {
            debug!("Last shared receiver gone, cutting off upstream");
            hub.upstream.done();
        }
    }

    fn detach(&self, notifier: &EventNotifier<E>) {
        drop(self.take_hub(notifier));
    }

    fn take_hub(&self, notifier: &EventNotifier<E>) -> Option<Hub<E>> {
        let mut hub = self.hub.borrow_mut();
        if hub
            .as_ref()
            .is_some_and(|hub| hub.notifier.ptr_eq(notifier))
        {
            hub.take()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// A cold source counting its upstream registrations.
    fn counted(notifier: &EventNotifier<u32>) -> (OnEvent<u32>, Rc<Cell<u32>>, Rc<Cell<u32>>) {
        let registrations = Rc::new(Cell::new(0_u32));
        let releases = Rc::new(Cell::new(0_u32));
        let (registered, released) = (Rc::clone(&registrations), Rc::clone(&releases));
        let inner = notifier.on_event();

        let source = OnEvent::new(move |receiver: EventReceiver<u32>| {
            registered.set(registered.get().saturating_add(1));
            let released = Rc::clone(&released);
            receiver.supply().when_off(move |_| released.set(released.get().saturating_add(1)));
            inner.register(receiver)
        });
        (source, registrations, releases)
    }

    #[test]
    fn test_share_registers_upstream_once() {
        let notifier = EventNotifier::new();
        let (source, registrations, releases) = counted(&notifier);
        let shared = source.share();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let (a, b) = (Rc::clone(&seen), Rc::clone(&seen));
        let first = shared.on(move |n| a.borrow_mut().push(("first", *n)));
        let second = shared.on(move |n| b.borrow_mut().push(("second", *n)));

        assert_eq!(registrations.get(), 1);
        notifier.send(1);
        assert_eq!(*seen.borrow(), vec![("first", 1), ("second", 1)]);

        first.done();
        assert_eq!(releases.get(), 0);
        second.done();
        assert_eq!(releases.get(), 1);
        assert_eq!(notifier.size(), 0);
    }

    #[test]
    fn test_share_restarts_after_teardown() {
        let notifier = EventNotifier::new();
        let (source, registrations, _releases) = counted(&notifier);
        let shared = source.share();

        shared.on(|_| {}).done();
        let supply = shared.on(|_| {});

        assert_eq!(registrations.get(), 2);
        assert!(!supply.is_off());
        assert_eq!(notifier.size(), 1);
    }

    #[test]
    fn test_recurrent_events_pass_through_share() {
        let notifier = EventNotifier::<u32>::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sender = notifier.clone();
        let sink = Rc::clone(&seen);
        notifier
            .on_event()
            .share()
            .register(EventReceiver::new(move |context, event: &u32| {
                sink.borrow_mut().push(format!("receive {event}"));
                let recurrent = Rc::clone(&sink);
                context.after_recurrent(move |event: &u32| {
                    recurrent.borrow_mut().push(format!("recurrent {event}"));
                });
                if *event == 1 {
                    sender.send(2);
                }
            }));

        notifier.send(1);
        notifier.send(3);

        assert_eq!(
            *seen.borrow(),
            vec!["receive 1", "recurrent 2", "receive 3"]
        );
    }

    #[test]
    fn test_recurrent_handlers_are_per_receiver() {
        let notifier = EventNotifier::<u32>::new();
        let shared = notifier.on_event().share();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sender = notifier.clone();
        let sink = Rc::clone(&seen);
        shared.register(EventReceiver::new(move |context, event: &u32| {
            sink.borrow_mut().push(format!("first {event}"));
            let recurrent = Rc::clone(&sink);
            context.after_recurrent(move |event: &u32| {
                recurrent.borrow_mut().push(format!("first recurrent {event}"));
            });
            if *event == 1 {
                sender.send(2);
            }
        }));
        let sink = Rc::clone(&seen);
        shared.on(move |event| sink.borrow_mut().push(format!("second {event}")));

        notifier.send(1);

        assert_eq!(
            *seen.borrow(),
            vec!["first 1", "second 1", "first recurrent 2", "second 2"]
        );
    }

    #[test]
    fn test_upstream_cutoff_ends_all_receivers() {
        let notifier = EventNotifier::<u32>::new();
        let shared = notifier.on_event().share();
        let first = shared.on(|_| {});
        let second = shared.on(|_| {});

        let reason = OffReason::msg("source gone");
        notifier.off(reason.clone());

        assert_eq!(first.reason(), Some(reason.clone()));
        assert_eq!(second.reason(), Some(reason));
    }

    #[test]
    fn test_source_panic_cuts_receivers() {
        let shared = OnEvent::<u32>::new(|_| panic!("broken source")).share();

        let receiver = EventReceiver::from_fn(|_: &u32| {});
        let supply = receiver.supply().clone();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| shared.register(receiver)));

        assert!(outcome.is_err());
        let reason = supply.reason().unwrap();
        assert!(matches!(
            reason.downcast_ref::<EventError>(),
            Some(EventError::SourcePanicked { message }) if message == "broken source"
        ));
    }

    #[test]
    fn test_off_receiver_does_not_start_upstream() {
        let notifier = EventNotifier::new();
        let (source, registrations, _releases) = counted(&notifier);
        let shared = source.share();

        let supply = shared.register(EventReceiver::with_supply(Supply::never(), |_, _| {}));
        assert!(supply.is_off());
        assert_eq!(registrations.get(), 0);
    }
}
