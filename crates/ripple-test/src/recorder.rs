//! Recording of delivered events and cutoff reasons.

use std::cell::RefCell;
use std::rc::Rc;

use ripple_events::{EventReceiver, EventSender};
use ripple_supply::{OffReason, Supply};

/// Records the events delivered to it, in delivery order.
///
/// Clones share the same record.
#[derive(Debug)]
pub struct Recorder<E> {
    events: Rc<RefCell<Vec<E>>>,
}

impl<E: Clone + 'static> Recorder<E> {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// A receive function appending each event to this recorder.
    #[must_use]
    pub fn receive(&self) -> impl Fn(&E) + 'static {
        let events = Rc::clone(&self.events);
        move |event: &E| events.borrow_mut().push(event.clone())
    }

    /// A receiver with a fresh supply appending each event to this recorder.
    #[must_use]
    pub fn receiver(&self) -> EventReceiver<E> {
        EventReceiver::from_fn(self.receive())
    }

    /// Record an event directly.
    pub fn push(&self, event: E) {
        self.events.borrow_mut().push(event);
    }

    /// The events recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<E> {
        self.events.borrow().clone()
    }

    /// Take the events recorded so far, leaving the recorder empty.
    #[must_use]
    pub fn take(&self) -> Vec<E> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    /// Number of events recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl<E: Clone + 'static> Default for Recorder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for Recorder<E> {
    fn clone(&self) -> Self {
        Self {
            events: Rc::clone(&self.events),
        }
    }
}

impl<E: Clone + 'static> EventSender<E> for Recorder<E> {
    fn send(&self, event: E) {
        self.push(event);
    }
}

/// Records the reasons supplies are cut off with.
#[derive(Debug, Clone, Default)]
pub struct OffRecord {
    reasons: Rc<RefCell<Vec<OffReason>>>,
}

impl OffRecord {
    /// Create an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the reason `supply` is cut off with.
    pub fn watch(&self, supply: &Supply) {
        let reasons = Rc::clone(&self.reasons);
        supply.when_off(move |reason| reasons.borrow_mut().push(reason.clone()));
    }

    /// The reasons recorded so far.
    #[must_use]
    pub fn reasons(&self) -> Vec<OffReason> {
        self.reasons.borrow().clone()
    }

    /// Number of cutoffs recorded.
    #[must_use]
    pub fn count(&self) -> usize {
        self.reasons.borrow().len()
    }
}
