//! Multicast event notifier.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::rc::Rc;

use ripple_supply::{OffReason, Supply};
use tracing::{debug, trace, warn};

use crate::on_event::OnEvent;
use crate::receiver::{EventContext, EventReceiver, RecurrentFn};
use crate::sender::{EventSender, EventSupplier};

/// One registration of a receiver.
struct Registration<E> {
    receiver: EventReceiver<E>,
    /// Recurrent handler registered during the current top-level send.
    recurrent: RefCell<Option<RecurrentFn<E>>>,
}

struct NotifierState<E> {
    /// Registrations keyed by a monotonic id, i.e. in registration order.
    registrations: BTreeMap<u64, Rc<Registration<E>>>,
    next_id: u64,
    dispatching: bool,
    /// Events sent while dispatching, in send order.
    queue: VecDeque<E>,
}

struct NotifierInner<E> {
    supply: Supply,
    state: RefCell<NotifierState<E>>,
}

/// Multicast registry and synchronous dispatcher of events.
///
/// Each [`send`](EventNotifier::send) delivers the event to the receivers
/// registered when the dispatch pass begins, in registration order. A
/// receiver whose supply is cut off before its turn is skipped; receivers
/// registered during the pass do not get the in-flight event.
///
/// Sends issued from inside a receiver do not recurse. They are queued and
/// dispatched one by one after the current pass, each to a fresh snapshot of
/// the registrations. See [`EventContext::after_recurrent`] for how a
/// receiver can handle these recurrent events separately.
///
/// A panic inside a receiver propagates out of `send` and aborts the rest of
/// the pass. Queued events are dropped and the notifier stays usable.
pub struct EventNotifier<E> {
    inner: Rc<NotifierInner<E>>,
}

impl<E: 'static> EventNotifier<E> {
    /// Create a new notifier.
    #[must_use]
    pub fn new() -> Self {
        let inner = Rc::new(NotifierInner {
            supply: Supply::new(),
            state: RefCell::new(NotifierState {
                registrations: BTreeMap::new(),
                next_id: 0,
                dispatching: false,
                queue: VecDeque::new(),
            }),
        });

        let notifier = Rc::downgrade(&inner);
        inner.supply.when_off(move |reason| {
            if let Some(notifier) = notifier.upgrade() {
                notifier.cut_all(reason);
            }
        });

        Self { inner }
    }

    /// The supply of the notifier itself. Cutting it off ends every
    /// registration.
    #[must_use]
    pub fn supply(&self) -> &Supply {
        &self.inner.supply
    }

    /// Whether the notifier is cut off.
    #[must_use]
    pub fn is_off(&self) -> bool {
        self.inner.supply.is_off()
    }

    /// Number of active registrations.
    #[must_use]
    pub fn size(&self) -> usize {
        self.inner.state.borrow().registrations.len()
    }

    /// Whether two handles refer to the same notifier.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Register a receiver.
    ///
    /// Returns the receiver's supply; cutting it off removes the
    /// registration. If the notifier is already off, the supply is cut off
    /// right away with the notifier's reason and the receiver is never
    /// called.
    pub fn register(&self, receiver: EventReceiver<E>) -> Supply {
        let supply = receiver.supply().clone();

        if let Some(reason) = self.inner.supply.reason() {
            trace!("Registration on a cut off notifier");
            supply.off(reason);
            return supply;
        }
        if supply.is_off() {
            return supply;
        }

        let id = {
            let mut state = self.inner.state.borrow_mut();
            let id = state.next_id;
            state.next_id = id.wrapping_add(1);
            state.registrations.insert(
                id,
                Rc::new(Registration {
                    receiver,
                    recurrent: RefCell::new(None),
                }),
            );
            id
        };

        debug!(registration = id, "Receiver registered");

        let notifier = Rc::downgrade(&self.inner);
        supply.when_off(move |_| {
            if let Some(notifier) = notifier.upgrade() {
                notifier.unregister(id);
            }
        });

        supply
    }

    /// Register a receive function.
    pub fn on<R>(&self, receive: R) -> Supply
    where
        R: Fn(&E) + 'static,
    {
        self.register(EventReceiver::from_fn(receive))
    }

    /// Send an event to every registered receiver.
    ///
    /// Does nothing once the notifier is cut off.
    pub fn send(&self, event: E) {
        self.inner.send(event);
    }

    /// Cut the notifier off, ending every registration with `reason`.
    pub fn off(&self, reason: OffReason) -> &Self {
        self.inner.supply.off(reason);
        self
    }

    /// Cut the notifier off with normal completion.
    pub fn done(&self) -> &Self {
        self.off(OffReason::Done)
    }

    /// Cut the notifier off with a failure.
    pub fn fail<X>(&self, error: X) -> &Self
    where
        X: Into<anyhow::Error>,
    {
        self.off(OffReason::failed(error))
    }

    /// A registrar for this notifier's events.
    #[must_use]
    pub fn on_event(&self) -> OnEvent<E> {
        let notifier = self.clone();
        OnEvent::new(move |receiver| notifier.register(receiver))
    }
}

impl<E: 'static> NotifierInner<E> {
    fn send(self: &Rc<Self>, event: E) {
        self.pass(event, false, false);
    }

    /// Run one top-level pass, then the events queued during it.
    fn pass(self: &Rc<Self>, event: E, recurrent: bool, keep_recurrent: bool) {
        if self.supply.is_off() {
            trace!("Event dropped, notifier is cut off");
            return;
        }

        {
            let mut state = self.state.borrow_mut();
            if state.dispatching {
                state.queue.push_back(event);
                trace!(queued = state.queue.len(), "Recurrent event queued");
                return;
            }
            state.dispatching = true;
        }

        if !recurrent {
            self.clear_recurrent();
        }
        let _guard = DispatchGuard {
            notifier: self,
            keep_recurrent,
        };

        self.dispatch(&event, recurrent);
        loop {
            let next = self.state.borrow_mut().queue.pop_front();
            let Some(next) = next else {
                break;
            };
            self.dispatch(&next, true);
        }
    }

    fn dispatch(self: &Rc<Self>, event: &E, recurrent: bool) {
        let snapshot: Vec<Rc<Registration<E>>> = self
            .state
            .borrow()
            .registrations
            .values()
            .cloned()
            .collect();

        trace!(receivers = snapshot.len(), recurrent, "Dispatching event");

        for registration in snapshot {
            if registration.receiver.supply().is_off() {
                continue;
            }

            if recurrent {
                let handler = registration.recurrent.borrow().clone();
                if let Some(handler) = handler {
                    handler(event);
                    continue;
                }
            }

            let context = self.context_for(&registration);
            registration.receiver.receive(&context, event);
        }
    }

    fn context_for(self: &Rc<Self>, registration: &Rc<Registration<E>>) -> EventContext<E> {
        let notifier = Rc::downgrade(self);
        let registration = Rc::downgrade(registration);

        EventContext::new(move |handler| {
            let dispatching = notifier
                .upgrade()
                .is_some_and(|notifier| notifier.is_dispatching());
            if !dispatching {
                return;
            }
            if let Some(registration) = registration.upgrade() {
                *registration.recurrent.borrow_mut() = Some(handler);
            }
        })
    }

    fn is_dispatching(&self) -> bool {
        self.state.borrow().dispatching
    }

    fn unregister(&self, id: u64) {
        let removed = self.state.borrow_mut().registrations.remove(&id);
        if removed.is_some() {
            debug!(registration = id, "Receiver unregistered");
        }
        drop(removed);
    }

    fn cut_all(&self, reason: &OffReason) {
        let (registrations, queue) = {
            let mut state = self.state.borrow_mut();
            (
                std::mem::take(&mut state.registrations),
                std::mem::take(&mut state.queue),
            )
        };

        debug!(
            receivers = registrations.len(),
            reason = %reason,
            "Notifier cut off"
        );

        for registration in registrations.into_values() {
            registration.receiver.supply().off(reason.clone());
        }
        drop(queue);
    }
}

impl<E: Clone + 'static> NotifierInner<E> {
    fn relay(self: &Rc<Self>, context: &EventContext<E>, event: E) {
        if self.supply.is_off() {
            return;
        }

        let notifier = Rc::downgrade(self);
        context.after_recurrent(move |event: &E| {
            if let Some(notifier) = notifier.upgrade() {
                notifier.pass(event.clone(), true, true);
            }
        });
        self.pass(event, false, true);
    }
}

impl<E> NotifierInner<E> {
    /// Drop the recurrent handlers of every registration.
    fn clear_recurrent(&self) {
        let registrations: Vec<_> = self.state.borrow().registrations.values().cloned().collect();
        for registration in registrations {
            let handler = registration.recurrent.borrow_mut().take();
            drop(handler);
        }
    }
}

/// Resets the dispatch state when a top-level pass ends, normally or by
/// unwinding.
struct DispatchGuard<'a, E> {
    notifier: &'a NotifierInner<E>,
    keep_recurrent: bool,
}

impl<E> Drop for DispatchGuard<'_, E> {
    fn drop(&mut self) {
        let queue = {
            let mut state = self.notifier.state.borrow_mut();
            state.dispatching = false;
            std::mem::take(&mut state.queue)
        };

        if !self.keep_recurrent {
            self.notifier.clear_recurrent();
        }

        if !queue.is_empty() {
            warn!(dropped = queue.len(), "Dispatch aborted, queued events dropped");
        }
    }
}

impl<E: Clone + 'static> EventNotifier<E> {
    /// Send an event received from an upstream dispatch.
    ///
    /// Recurrent events of the upstream pass are dispatched here as recurrent
    /// too. Recurrent handlers stay registered until the next relayed event.
    pub(crate) fn relay(&self, context: &EventContext<E>, event: E) {
        self.inner.relay(context, event);
    }
}

impl<E: 'static> Default for EventNotifier<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for EventNotifier<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E> fmt::Debug for EventNotifier<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = self
            .inner
            .state
            .try_borrow()
            .map(|state| state.registrations.len())
            .unwrap_or_default();
        f.debug_struct("EventNotifier")
            .field("size", &size)
            .field("reason", &self.inner.supply.reason())
            .finish()
    }
}

impl<E: 'static> EventSender<E> for EventNotifier<E> {
    fn send(&self, event: E) {
        self.inner.send(event);
    }
}

impl<E: 'static> EventSupplier<E> for EventNotifier<E> {
    fn on_event(&self) -> OnEvent<E> {
        EventNotifier::on_event(self)
    }
}
