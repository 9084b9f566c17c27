//! Ripple Events - In-process event propagation.
//!
//! This crate provides:
//! - [`EventNotifier`], a multicast registry with synchronous dispatch and
//!   queued recurrent sends
//! - [`OnEvent`], a composable registrar, and the [`operators`] over it
//! - [`AfterEvent`], a registrar remembering the last event
//! - [`resolve_on`], asynchronous resolution of event payloads
//! - [`on_any`], fan-in of several registrars
//!
//! Every registration is represented by a [`Supply`]. Cutting it off ends
//! the registration, and an ended source cuts the supply off with its reason.
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use ripple_events::prelude::*;
//!
//! let notifier = EventNotifier::<String>::new();
//! let seen = Rc::new(RefCell::new(Vec::new()));
//!
//! let sink = Rc::clone(&seen);
//! let supply = notifier
//!     .on_event()
//!     .filter(|line: &String| !line.is_empty())
//!     .map(|line: &String| line.len())
//!     .on(move |len| sink.borrow_mut().push(*len));
//!
//! notifier.send("hello".to_string());
//! notifier.send(String::new());
//! notifier.fail(anyhow::anyhow!("stream closed"));
//!
//! assert_eq!(*seen.borrow(), vec![5]);
//! assert!(supply.is_off());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod operators;
pub mod prelude;

mod after_event;
mod combinators;
mod error;
mod notifier;
mod on_event;
mod receiver;
mod resolve;
mod sender;

pub use after_event::AfterEvent;
pub use combinators::{on_any, on_never, on_supplied};
pub use error::{EventError, EventResult};
pub use notifier::EventNotifier;
pub use on_event::OnEvent;
pub use operators::Pass;
pub use receiver::{EventContext, EventReceiver};
pub use resolve::{Promise, Resolvable, TokioLocalSpawner, resolve_on, resolve_on_ordered};
pub use ripple_supply::{OffReason, Supply};
pub use sender::{EventSender, EventSupplier};
