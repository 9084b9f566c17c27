//! Telemetry error types.

use std::path::PathBuf;

use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::util::TryInitError;

/// Failures while loading a log configuration or installing the subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The TOML document is malformed or does not describe a log
    /// configuration.
    #[error("invalid log configuration: {0}")]
    InvalidConfig(#[from] toml::de::Error),

    /// The `logging` key holds something other than a table.
    #[error("`logging` must be a table, found {found}")]
    LoggingNotTable {
        /// TOML type found instead.
        found: &'static str,
    },

    /// A level or filter directive does not parse.
    #[error("invalid filter directive `{directive}`")]
    InvalidDirective {
        /// The offending directive.
        directive: String,
        /// Parser error.
        #[source]
        source: ParseError,
    },

    /// The log directory could not be created.
    #[error("cannot create log directory {}", .path.display())]
    LogDirectory {
        /// Directory that was to be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The rolling log file could not be opened.
    #[error("cannot open log files in {}", .path.display())]
    LogFiles {
        /// Log directory.
        path: PathBuf,
        /// Appender error.
        #[source]
        source: tracing_appender::rolling::InitError,
    },

    /// A global subscriber is already installed.
    #[error("a global tracing subscriber is already installed")]
    AlreadyInstalled(#[from] TryInitError),
}

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
