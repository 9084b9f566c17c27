//! Ripple Telemetry - Logging for applications built on the Ripple event core.
//!
//! This crate provides:
//! - Configurable logging setup with multiple formats and targets
//! - Loading of the logging configuration from TOML and environment
//!   variables
//!
//! The event crates only emit `tracing` events; installing a subscriber is
//! left to the application.
//!
//! # Example
//!
//! ```rust,no_run
//! use ripple_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), ripple_telemetry::TelemetryError> {
//! let config = LogConfig::from_toml_str(
//!     r#"
//!     [logging]
//!     level = "info"
//!     core_level = "trace"
//!     "#,
//! )?
//! .with_format(LogFormat::Compact);
//!
//! setup_logging(&config)?;
//! tracing::info!("Logging ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

mod config;
mod error;
mod logging;

pub use config::ENV_PREFIX;
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{FileRotation, LogConfig, LogFiles, LogFormat, LogOutput, setup_logging};
