//! Supply error types.

use std::any::Any;

use thiserror::Error;

/// Errors reported through a supply's cutoff channel.
#[derive(Debug, Error)]
pub enum SupplyError {
    /// Every handle to the supply was dropped before it was cut off.
    #[error("supply dropped before it was cut off")]
    Dropped,
}

/// Extract a human-readable message from a panic payload.
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
