//! Prelude module - commonly used types for convenient import.
//!
//! Use `use ripple_events::prelude::*;` to import all essential types.

pub use crate::{
    AfterEvent, EventContext, EventError, EventNotifier, EventReceiver, EventResult,
    EventSender, EventSupplier, OffReason, OnEvent, Pass, Resolvable, Supply, on_any,
    on_never, resolve_on,
};
