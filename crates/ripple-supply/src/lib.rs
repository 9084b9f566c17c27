//! Ripple Supply - Subscription lifecycle handles for the Ripple event core.
//!
//! This crate provides:
//! - [`Supply`], a cancellation token representing one subscription
//! - [`OffReason`], the reason a supply was cut off
//! - Supply composition (`needs`, `cuts`, `needs_all`)
//!
//! # Example
//!
//! ```rust
//! use ripple_supply::{OffReason, Supply};
//!
//! let upstream = Supply::new();
//! let downstream = Supply::new();
//! downstream.needs(&upstream);
//!
//! upstream.fail(anyhow::anyhow!("connection lost"));
//!
//! assert!(downstream.is_off());
//! assert_eq!(
//!     downstream.reason().map(|reason| reason.to_string()),
//!     Some("connection lost".to_string()),
//! );
//! # let _ = OffReason::Done;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod joint;
mod reason;
mod supply;

pub use error::{SupplyError, panic_message};
pub use reason::OffReason;
pub use supply::Supply;
