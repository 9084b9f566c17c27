//! Prelude module - commonly used types for convenient import.
//!
//! Use `use ripple_telemetry::prelude::*;` to import all essential types.

pub use crate::{
    LogConfig, LogFiles, LogFormat, LogOutput, TelemetryError, TelemetryResult, setup_logging,
};
