//! Event receivers and their dispatch context.

use std::fmt;
use std::rc::Rc;

use ripple_supply::Supply;

/// Handler of recurrent events registered through [`EventContext::after_recurrent`].
pub(crate) type RecurrentFn<E> = Rc<dyn Fn(&E)>;

/// Context of a single event delivery.
///
/// Passed to every [`EventReceiver`] along with the event itself.
pub struct EventContext<E> {
    on_recurrent: Rc<dyn Fn(RecurrentFn<E>)>,
}

impl<E: 'static> EventContext<E> {
    pub(crate) fn new<R>(on_recurrent: R) -> Self
    where
        R: Fn(RecurrentFn<E>) + 'static,
    {
        Self {
            on_recurrent: Rc::new(on_recurrent),
        }
    }

    /// A context outside of any dispatch. Recurrent handlers registered
    /// through it are ignored.
    #[must_use]
    pub fn detached() -> Self {
        Self::new(|_| {})
    }

    /// Handle recurrent events with `receiver`.
    ///
    /// Events sent to the same notifier while the current one is being
    /// dispatched are queued until the current pass completes. When they are
    /// dispatched, this receiver gets them through `receiver` instead of its
    /// regular receive function. The handler is discarded once the top-level
    /// send completes.
    pub fn after_recurrent<R>(&self, receiver: R)
    where
        R: Fn(&E) + 'static,
    {
        (self.on_recurrent)(Rc::new(receiver));
    }

    /// Derive a context for transformed events.
    ///
    /// Recurrent handlers registered on the derived context receive the
    /// upstream recurrent events after `convert` has turned them into zero or
    /// more downstream events.
    pub(crate) fn map<F, C>(&self, convert: C) -> EventContext<F>
    where
        F: 'static,
        C: Fn(&E, &dyn Fn(&F)) + 'static,
    {
        let upstream = self.clone();
        let convert = Rc::new(convert);
        EventContext::new(move |receiver: RecurrentFn<F>| {
            let convert = Rc::clone(&convert);
            upstream.after_recurrent(move |event: &E| convert(event, &*receiver));
        })
    }
}

impl<E> Clone for EventContext<E> {
    fn clone(&self) -> Self {
        Self {
            on_recurrent: Rc::clone(&self.on_recurrent),
        }
    }
}

impl<E> fmt::Debug for EventContext<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventContext").finish_non_exhaustive()
    }
}

/// A receive function paired with the supply of its registration.
///
/// Registering the same receiver twice creates two independent registrations
/// sharing one supply.
pub struct EventReceiver<E> {
    supply: Supply,
    receive: Rc<dyn Fn(&EventContext<E>, &E)>,
}

impl<E: 'static> EventReceiver<E> {
    /// Create a receiver with a fresh supply.
    pub fn new<R>(receive: R) -> Self
    where
        R: Fn(&EventContext<E>, &E) + 'static,
    {
        Self::with_supply(Supply::new(), receive)
    }

    /// Create a receiver bound to an existing supply.
    pub fn with_supply<R>(supply: Supply, receive: R) -> Self
    where
        R: Fn(&EventContext<E>, &E) + 'static,
    {
        Self {
            supply,
            receive: Rc::new(receive),
        }
    }

    /// Create a receiver that ignores the dispatch context.
    pub fn from_fn<R>(receive: R) -> Self
    where
        R: Fn(&E) + 'static,
    {
        Self::new(move |_, event| receive(event))
    }

    /// The supply of this receiver's registrations.
    #[must_use]
    pub fn supply(&self) -> &Supply {
        &self.supply
    }

    /// Deliver an event to this receiver.
    pub fn receive(&self, context: &EventContext<E>, event: &E) {
        (self.receive)(context, event);
    }
}

impl<E> Clone for EventReceiver<E> {
    fn clone(&self) -> Self {
        Self {
            supply: self.supply.clone(),
            receive: Rc::clone(&self.receive),
        }
    }
}

impl<E> fmt::Debug for EventReceiver<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventReceiver")
            .field("supply", &self.supply)
            .finish_non_exhaustive()
    }
}
