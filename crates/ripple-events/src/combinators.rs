//! Registrars built from other registrars.

use ripple_supply::Supply;

use crate::on_event::OnEvent;
use crate::receiver::EventReceiver;
use crate::sender::EventSupplier;

/// A registrar that never sends events.
///
/// Every registration is cut off right away.
#[must_use]
pub fn on_never<E: 'static>() -> OnEvent<E> {
    OnEvent::new(|receiver: EventReceiver<E>| {
        let supply = receiver.supply().clone();
        supply.done();
        supply
    })
}

/// Merge the events of several registrars.
///
/// A registration is cut off once every source has cut its part off, with
/// the reason of the last one. Cutting the registration off cuts off the
/// registrations with every source. Without sources this is [`on_never`].
#[must_use]
pub fn on_any<E, I>(sources: I) -> OnEvent<E>
where
    E: 'static,
    I: IntoIterator<Item = OnEvent<E>>,
{
    let sources: Vec<OnEvent<E>> = sources.into_iter().collect();
    if sources.is_empty() {
        return on_never();
    }

    OnEvent::new(move |receiver: EventReceiver<E>| {
        let supply = receiver.supply().clone();
        let parts: Vec<Supply> = sources.iter().map(|_| supply.derive()).collect();
        supply.needs_all(&parts);

        for (source, part) in sources.iter().zip(parts) {
            let downstream = receiver.clone();
            source.register(EventReceiver::with_supply(part, move |context, event| {
                downstream.receive(context, event);
            }));
        }

        supply
    })
}

/// The registrar of anything supplying events.
pub fn on_supplied<E, S>(supplier: &S) -> OnEvent<E>
where
    E: 'static,
    S: EventSupplier<E> + ?Sized,
{
    supplier.on_event()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::EventNotifier;
    use ripple_supply::OffReason;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_on_never_cuts_off_immediately() {
        let supply = on_never::<u32>().on(|_| panic!("never called"));
        assert!(supply.is_off());
        assert!(supply.reason().is_some_and(|reason| reason.is_done()));
    }

    #[test]
    fn test_on_any_merges_events() {
        let first = EventNotifier::new();
        let second = EventNotifier::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        on_any([first.on_event(), second.on_event()])
            .on(move |event: &&str| sink.borrow_mut().push(*event));
        first.send("a");
        second.send("b");
        first.send("c");

        assert_eq!(*seen.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_on_any_cuts_off_after_all_sources() {
        let first = EventNotifier::<u32>::new();
        let second = EventNotifier::<u32>::new();
        let supply = on_any([first.on_event(), second.on_event()]).on(|_| {});

        first.done();
        assert!(!supply.is_off());

        let reason = OffReason::msg("second gone");
        second.off(reason.clone());
        assert_eq!(supply.reason(), Some(reason));
    }

    #[test]
    fn test_on_any_cutoff_reaches_sources() {
        let first = EventNotifier::<u32>::new();
        let second = EventNotifier::<u32>::new();
        let supply = on_any([first.on_event(), second.on_event()]).on(|_| {});
        assert_eq!((first.size(), second.size()), (1, 1));

        supply.done();
        assert_eq!((first.size(), second.size()), (0, 0));
    }

    #[test]
    fn test_on_any_without_sources() {
        let supply = on_any(Vec::<OnEvent<u32>>::new()).on(|_| {});
        assert!(supply.is_off());
    }

    #[test]
    fn test_on_supplied() {
        let notifier = EventNotifier::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        on_supplied(&notifier).on(move |event: &u32| sink.borrow_mut().push(*event));
        notifier.send(1);

        assert_eq!(*seen.borrow(), vec![1]);
    }
}
