//! Event error types.

use futures::task::SpawnError;
use thiserror::Error;

/// Errors raised by registrars and event stages.
#[derive(Debug, Error)]
pub enum EventError {
    /// A receiver asked for the current event before any was produced and
    /// no fallback exists.
    #[error("no events to send")]
    NoEvent,

    /// A resolution task could not be spawned on the executor.
    #[error("failed to spawn resolution task: {0}")]
    Spawn(#[from] SpawnError),

    /// The upstream source of a shared registrar panicked while registering.
    #[error("event source panicked while registering: {message}")]
    SourcePanicked {
        /// The panic message.
        message: String,
    },
}

/// Result type for event operations.
pub type EventResult<T> = Result<T, EventError>;
