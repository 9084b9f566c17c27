//! Prelude module - commonly used test utilities.
//!
//! Use `use ripple_test::prelude::*;` in tests.

pub use crate::{OffRecord, Recorder, setup_test_logging, trace_event_core};
