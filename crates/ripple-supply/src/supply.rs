//! Subscription supply.

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use futures::channel::oneshot;
use tracing::{trace, warn};

use crate::error::{SupplyError, panic_message};
use crate::joint::Joint;
use crate::reason::OffReason;

/// Callback invoked once a supply is cut off.
pub(crate) type OffCallback = Box<dyn FnOnce(&OffReason)>;

/// Key of a registered listener, used to unhook it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ListenerKey(u64);

struct Listener {
    key: ListenerKey,
    callback: OffCallback,
}

enum SupplyState {
    On {
        listeners: Vec<Listener>,
        next_key: u64,
    },
    Off(OffReason),
}

pub(crate) struct SupplyInner {
    state: RefCell<SupplyState>,
}

/// A handle representing one subscription.
///
/// A supply starts active and is cut off at most once. The first reason
/// passed to [`Supply::off`] is stored and handed to every listener
/// registered with [`Supply::when_off`], in registration order. Later cutoffs
/// are ignored.
///
/// Cloning a supply creates another handle to the same subscription.
/// Dropping handles never cuts a supply off.
#[derive(Clone)]
pub struct Supply {
    inner: Rc<SupplyInner>,
}

impl Supply {
    /// Create a new active supply.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(SupplyInner {
                state: RefCell::new(SupplyState::On {
                    listeners: Vec::new(),
                    next_key: 0,
                }),
            }),
        }
    }

    /// Create a supply that is already cut off.
    #[must_use]
    pub fn never() -> Self {
        let supply = Self::new();
        supply.done();
        supply
    }

    /// Whether this supply is cut off.
    #[must_use]
    pub fn is_off(&self) -> bool {
        matches!(*self.inner.state.borrow(), SupplyState::Off(_))
    }

    /// The reason this supply was cut off with, if it is off.
    #[must_use]
    pub fn reason(&self) -> Option<OffReason> {
        match &*self.inner.state.borrow() {
            SupplyState::On { .. } => None,
            SupplyState::Off(reason) => Some(reason.clone()),
        }
    }

    /// Whether two handles refer to the same supply.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Cut this supply off.
    ///
    /// The first call stores `reason` and invokes every pending listener with
    /// it. A listener that panics is logged and skipped; the others still run.
    /// Subsequent calls do nothing.
    pub fn off(&self, reason: OffReason) -> &Self {
        let listeners = {
            let mut state = self.inner.state.borrow_mut();
            match &mut *state {
                SupplyState::Off(_) => return self,
                SupplyState::On { listeners, .. } => {
                    let listeners = std::mem::take(listeners);
                    *state = SupplyState::Off(reason.clone());
                    listeners
                },
            }
        };

        trace!(reason = %reason, listeners = listeners.len(), "Supply cut off");

        for listener in listeners {
            let callback = listener.callback;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback(&reason)));
            if let Err(payload) = outcome {
                warn!(panic = %panic_message(&*payload), "Supply listener panicked");
            }
        }

        self
    }

    /// Cut this supply off with normal completion.
    pub fn done(&self) -> &Self {
        self.off(OffReason::Done)
    }

    /// Cut this supply off because of `error`.
    pub fn fail<E>(&self, error: E) -> &Self
    where
        E: Into<anyhow::Error>,
    {
        self.off(OffReason::failed(error))
    }

    /// Register a listener for the cutoff.
    ///
    /// If the supply is already off, the listener is called immediately with
    /// the stored reason.
    pub fn when_off<F>(&self, callback: F) -> &Self
    where
        F: FnOnce(&OffReason) + 'static,
    {
        self.listen(Box::new(callback));
        self
    }

    /// Make this supply depend on `other`: once `other` is cut off, this one
    /// is cut off with the same reason.
    ///
    /// If this supply goes off first, its listener is removed from `other`.
    pub fn needs(&self, other: &Supply) -> &Self {
        if self.is_off() {
            return self;
        }

        let dependent = self.clone();
        let Some(key) = other.listen(Box::new(move |reason| {
            dependent.off(reason.clone());
        })) else {
            return self;
        };

        let required = other.downgrade();
        self.listen(Box::new(move |_| {
            if let Some(required) = required.upgrade() {
                required.unlisten(key);
            }
        }));

        self
    }

    /// Make `other` depend on this supply. The inverse of [`Supply::needs`].
    pub fn cuts(&self, other: &Supply) -> &Self {
        other.needs(self);
        self
    }

    /// Create a new supply that depends on this one.
    #[must_use]
    pub fn derive(&self) -> Supply {
        let derived = Supply::new();
        derived.needs(self);
        derived
    }

    /// Make this supply depend on all of `parts` jointly: it is cut off once
    /// every part is off, with the reason of the last part to go off.
    ///
    /// An empty set of parts leaves this supply untouched.
    pub fn needs_all<'a, I>(&self, parts: I) -> &Self
    where
        I: IntoIterator<Item = &'a Supply>,
    {
        let parts: Vec<&Supply> = parts.into_iter().collect();
        if parts.is_empty() || self.is_off() {
            return self;
        }

        let joint = Rc::new(Joint::new(self.clone(), parts.len()));
        for part in parts {
            Joint::attach(&joint, part);
        }

        self
    }

    /// A future resolving once this supply is cut off.
    ///
    /// Resolves to `Ok(())` on normal completion and to `Err(reason)` on
    /// failure. If every handle is dropped while the supply is still active,
    /// resolves to an error wrapping [`SupplyError::Dropped`].
    pub fn when_done(&self) -> impl Future<Output = Result<(), OffReason>> + 'static {
        let (tx, rx) = oneshot::channel();
        self.when_off(move |reason| {
            let _ = tx.send(reason.clone());
        });

        async move {
            match rx.await {
                Ok(OffReason::Done) => Ok(()),
                Ok(reason) => Err(reason),
                Err(oneshot::Canceled) => Err(OffReason::failed(SupplyError::Dropped)),
            }
        }
    }

    /// Register a listener, returning its key while the supply is active.
    ///
    /// Returns `None` after calling the listener immediately when the supply
    /// is already off.
    pub(crate) fn listen(&self, callback: OffCallback) -> Option<ListenerKey> {
        let reason = {
            let mut state = self.inner.state.borrow_mut();
            match &mut *state {
                SupplyState::On {
                    listeners,
                    next_key,
                } => {
                    let key = ListenerKey(*next_key);
                    *next_key = next_key.wrapping_add(1);
                    listeners.push(Listener { key, callback });
                    return Some(key);
                },
                SupplyState::Off(reason) => reason.clone(),
            }
        };

        callback(&reason);
        None
    }

    /// Remove a listener that has not fired yet.
    pub(crate) fn unlisten(&self, key: ListenerKey) {
        let removed = {
            let mut state = self.inner.state.borrow_mut();
            match &mut *state {
                SupplyState::On { listeners, .. } => listeners
                    .iter()
                    .position(|listener| listener.key == key)
                    .map(|index| listeners.remove(index)),
                SupplyState::Off(_) => None,
            }
        };
        drop(removed);
    }

    pub(crate) fn downgrade(&self) -> WeakSupply {
        WeakSupply(Rc::downgrade(&self.inner))
    }

    #[cfg(test)]
    pub(crate) fn listener_count(&self) -> usize {
        match &*self.inner.state.borrow() {
            SupplyState::On { listeners, .. } => listeners.len(),
            SupplyState::Off(_) => 0,
        }
    }
}

impl Default for Supply {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Supply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supply")
            .field("reason", &self.reason())
            .finish()
    }
}

/// Non-owning supply reference.
pub(crate) struct WeakSupply(Weak<SupplyInner>);

impl WeakSupply {
    pub(crate) fn upgrade(&self) -> Option<Supply> {
        self.0.upgrade().map(|inner| Supply { inner })
    }
}
