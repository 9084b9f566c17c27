//! Event registrar.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ripple_supply::Supply;

use crate::operators::{self, Pass};
use crate::receiver::EventReceiver;
use crate::sender::{EventSender, EventSupplier};

type RegisterFn<E> = Rc<dyn Fn(EventReceiver<E>) -> Supply>;

/// A reusable "subscribe to this stream" function.
///
/// Wraps a registration function taking an [`EventReceiver`] and returning
/// the supply of the new registration. Any event source adapts to the rest of
/// the crate through [`OnEvent::new`].
///
/// Operators build new registrars from existing ones with
/// [`pipe`](OnEvent::pipe). The input registrar is never modified.
///
/// ```
/// use ripple_events::prelude::*;
///
/// let notifier = EventNotifier::<u32>::new();
/// let doubled = notifier.on_event().map(|n: &u32| n * 2);
///
/// let supply = doubled.on(|n| assert_eq!(*n, 42));
/// notifier.send(21);
/// supply.done();
/// ```
pub struct OnEvent<E> {
    register: RegisterFn<E>,
}

impl<E: 'static> OnEvent<E> {
    /// Create a registrar from a registration function.
    ///
    /// The function must return a supply that is cut off when the
    /// registration ends, normally the receiver's own supply.
    pub fn new<R>(register: R) -> Self
    where
        R: Fn(EventReceiver<E>) -> Supply + 'static,
    {
        Self {
            register: Rc::new(register),
        }
    }

    /// Register a receiver.
    pub fn register(&self, receiver: EventReceiver<E>) -> Supply {
        (self.register)(receiver)
    }

    /// Register a receive function.
    pub fn on<R>(&self, receive: R) -> Supply
    where
        R: Fn(&E) + 'static,
    {
        self.register(EventReceiver::from_fn(receive))
    }

    /// Register a receive function and drop the supply handle.
    ///
    /// The registration lasts until the source ends it.
    pub fn to<R>(&self, receive: R)
    where
        R: Fn(&E) + 'static,
    {
        drop(self.on(receive));
    }

    /// Register a receive function for the first event only.
    ///
    /// The registration is cut off right before the event is delivered, so
    /// events sent from inside `receive` are not seen.
    pub fn once<R>(&self, receive: R) -> Supply
    where
        R: FnOnce(&E) + 'static,
    {
        let supply = Supply::new();
        let gate = supply.clone();
        let receive = RefCell::new(Some(receive));

        self.register(EventReceiver::with_supply(supply, move |_, event| {
            let receive = receive.borrow_mut().take();
            if let Some(receive) = receive {
                gate.done();
                receive(event);
            }
        }))
    }

    /// Register a consumer that may start a nested activity per event.
    ///
    /// Each call of `consume` may return the supply of whatever it started.
    /// That supply is cut off when the next event arrives, and when the
    /// registration itself is cut off.
    pub fn consume<C>(&self, consume: C) -> Supply
    where
        C: Fn(&E) -> Option<Supply> + 'static,
    {
        let supply = Supply::new();
        let current: Rc<RefCell<Option<Supply>>> = Rc::default();

        let last = Rc::clone(&current);
        supply.when_off(move |_| {
            let previous = last.borrow_mut().take();
            if let Some(previous) = previous {
                previous.done();
            }
        });

        let outer = supply.clone();
        self.register(EventReceiver::with_supply(supply, move |_, event| {
            let previous = current.borrow_mut().take();
            if let Some(previous) = previous {
                previous.done();
            }

            if let Some(next) = consume(event) {
                if outer.is_off() {
                    next.done();
                } else {
                    *current.borrow_mut() = Some(next);
                }
            }
        }))
    }

    /// Apply an operator to this registrar.
    ///
    /// Chained calls apply operators left to right.
    pub fn pipe<R, O>(&self, operator: O) -> R
    where
        O: FnOnce(&Self) -> R,
    {
        operator(self)
    }

    /// Transform each event with a pass function. See [`operators::thru`].
    #[must_use]
    pub fn thru<F, P>(&self, pass: P) -> OnEvent<F>
    where
        F: 'static,
        P: Fn(&E) -> Pass<F> + 'static,
    {
        self.pipe(operators::thru(pass))
    }

    /// Convert each event. See [`operators::map`].
    #[must_use]
    pub fn map<F, M>(&self, convert: M) -> OnEvent<F>
    where
        F: 'static,
        M: Fn(&E) -> F + 'static,
    {
        self.pipe(operators::map(convert))
    }

    /// Pass through the events matching `predicate`. See [`operators::filter`].
    #[must_use]
    pub fn filter<P>(&self, predicate: P) -> Self
    where
        P: Fn(&E) -> bool + 'static,
    {
        self.pipe(operators::filter(predicate))
    }

    /// Follow the nested registrar extracted from each event. See
    /// [`operators::dig`].
    #[must_use]
    pub fn dig<F, X>(&self, extract: X) -> OnEvent<F>
    where
        F: 'static,
        X: Fn(&E) -> Option<OnEvent<F>> + 'static,
    {
        self.pipe(operators::dig(extract))
    }

    /// Make every registration also depend on `required`. See
    /// [`operators::supply_on`].
    #[must_use]
    pub fn supply_on(&self, required: &Supply) -> Self {
        self.pipe(operators::supply_on(required))
    }
}

impl<E: Clone + 'static> OnEvent<E> {
    /// Share one upstream registration among all receivers. See
    /// [`operators::share`].
    #[must_use]
    pub fn share(&self) -> Self {
        self.pipe(operators::share())
    }

    /// Send every event to `target`, e.g. another notifier.
    pub fn forward<S>(&self, target: S) -> Supply
    where
        S: EventSender<E> + 'static,
    {
        self.on(move |event: &E| target.send(event.clone()))
    }
}

impl<E> Clone for OnEvent<E> {
    fn clone(&self) -> Self {
        Self {
            register: Rc::clone(&self.register),
        }
    }
}

impl<E> fmt::Debug for OnEvent<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnEvent").finish_non_exhaustive()
    }
}

impl<E: 'static> EventSupplier<E> for OnEvent<E> {
    fn on_event(&self) -> OnEvent<E> {
        self.clone()
    }
}
