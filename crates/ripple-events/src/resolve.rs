//! Asynchronous resolution of event payloads.
//!
//! [`resolve_on`] turns a stream of [`Resolvable`] payloads into a stream of
//! resolved values tagged with their 1-based emission index. Values are
//! delivered as soon as they resolve, so a slow promise does not hold back
//! later values.
//!
//! Resolutions run as tasks on a caller-supplied [`LocalSpawn`] executor:
//! [`futures::executor::LocalPool`] or a tokio [`LocalSet`] through
//! [`TokioLocalSpawner`].

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::future::{self, FutureExt, LocalBoxFuture, Shared};
use futures::task::{LocalFutureObj, LocalSpawn, LocalSpawnExt, SpawnError};
use ripple_supply::{OffReason, Supply};
use tokio::task::LocalSet;
use tracing::{debug, trace, warn};

use crate::error::EventError;
use crate::notifier::EventNotifier;
use crate::on_event::OnEvent;
use crate::receiver::{EventContext, EventReceiver};

/// A local future that can be awaited any number of times.
///
/// Fails with the reason to cut the resolved stream off with.
pub type Promise<T> = Shared<LocalBoxFuture<'static, Result<T, OffReason>>>;

/// Payload that is either available or still being computed.
pub enum Resolvable<T> {
    /// A plain value.
    Value(T),
    /// A value to wait for.
    Promise(Promise<T>),
}

impl<T: Clone + 'static> Resolvable<T> {
    /// A plain value.
    pub fn value(value: T) -> Self {
        Self::Value(value)
    }

    /// A value produced by `future`.
    pub fn promise<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, OffReason>> + 'static,
    {
        Self::Promise(future.boxed_local().shared())
    }

    /// A future settling with the payload.
    ///
    /// A plain value is ready on the first poll. A promise is only awaited
    /// after yielding once to the executor.
    fn settle(self) -> LocalBoxFuture<'static, Result<T, OffReason>> {
        match self {
            Self::Value(value) => future::ready(Ok(value)).boxed_local(),
            Self::Promise(promise) => async move {
                tokio::task::yield_now().await;
                promise.await
            }
            .boxed_local(),
        }
    }
}

impl<T: Clone> Clone for Resolvable<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Value(value) => Self::Value(value.clone()),
            Self::Promise(promise) => Self::Promise(promise.clone()),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Resolvable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Promise(_) => f.write_str("Promise(..)"),
        }
    }
}

impl<T> From<T> for Resolvable<T> {
    fn from(value: T) -> Self {
        Self::Value(value)
    }
}

/// Resolve each payload on `spawner` and deliver `(value, index)` in
/// completion order.
///
/// Each registration gets its own index counter starting at 1. A failed
/// resolution cuts the registration off with the failure reason; nothing is
/// delivered after that. An upstream cutoff ends the registration with the
/// same reason and discards pending resolutions. A task that cannot be
/// spawned cuts the registration off with [`EventError::Spawn`].
pub fn resolve_on<T, S>(spawner: S) -> impl FnOnce(&OnEvent<Resolvable<T>>) -> OnEvent<(T, u64)>
where
    T: Clone + 'static,
    S: LocalSpawn + Clone + 'static,
{
    move |source| {
        let source = source.clone();

        OnEvent::new(move |receiver: EventReceiver<(T, u64)>| {
            let resolved = EventNotifier::new();
            let supply = resolved.register(receiver);

            let upstream = Supply::new();
            upstream.needs(&supply);
            let downstream = resolved.clone();
            upstream.when_off(move |reason| {
                downstream.off(reason.clone());
            });

            let counter = Cell::new(0_u64);
            let spawner = spawner.clone();
            source.register(EventReceiver::with_supply(
                upstream,
                move |_, payload: &Resolvable<T>| {
                    let index = counter.get().wrapping_add(1);
                    counter.set(index);

                    let settle = payload.clone().settle();
                    let target = resolved.clone();
                    let task = async move {
                        let outcome = settle.await;
                        if target.is_off() {
                            trace!(index, "Resolution discarded");
                            return;
                        }
                        match outcome {
                            Ok(value) => target.send((value, index)),
                            Err(reason) => {
                                debug!(index, %reason, "Resolution failed");
                                target.off(reason);
                            },
                        }
                    };

                    if let Err(error) = spawner.spawn_local(task) {
                        warn!(index, %error, "Failed to spawn resolution task");
                        resolved.off(OffReason::failed(EventError::Spawn(error)));
                    }
                },
            ));

            supply
        })
    }
}

/// Resolve each payload on `spawner` and deliver the values in emission
/// order.
///
/// Values resolved ahead of an earlier one are buffered until it arrives.
/// Failure and cutoff behave as with [`resolve_on`].
pub fn resolve_on_ordered<T, S>(spawner: S) -> impl FnOnce(&OnEvent<Resolvable<T>>) -> OnEvent<T>
where
    T: Clone + 'static,
    S: LocalSpawn + Clone + 'static,
{
    move |source| {
        let indexed = source.pipe(resolve_on(spawner));

        OnEvent::new(move |receiver: EventReceiver<T>| {
            let pending: RefCell<BTreeMap<u64, T>> = RefCell::new(BTreeMap::new());
            let next = Cell::new(1_u64);
            let supply = receiver.supply().clone();

            indexed.register(EventReceiver::with_supply(
                supply,
                move |_, (value, index): &(T, u64)| {
                    pending.borrow_mut().insert(*index, value.clone());
                    loop {
                        let ready = pending.borrow_mut().remove(&next.get());
                        let Some(value) = ready else {
                            break;
                        };
                        next.set(next.get().wrapping_add(1));
                        receiver.receive(&EventContext::detached(), &value);
                        if receiver.supply().is_off() {
                            break;
                        }
                    }
                },
            ))
        })
    }
}

/// Runs resolution tasks on a tokio [`LocalSet`].
///
/// Tasks only make progress while the set is driven, e.g. by
/// [`LocalSet::run_until`].
#[derive(Clone, Debug, Default)]
pub struct TokioLocalSpawner {
    set: Rc<LocalSet>,
}

impl TokioLocalSpawner {
    /// Create a spawner with a fresh local set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The local set tasks are spawned on.
    #[must_use]
    pub fn local_set(&self) -> &LocalSet {
        &self.set
    }
}

impl LocalSpawn for TokioLocalSpawner {
    fn spawn_local_obj(&self, future: LocalFutureObj<'static, ()>) -> Result<(), SpawnError> {
        drop(self.set.spawn_local(future));
        Ok(())
    }
}
