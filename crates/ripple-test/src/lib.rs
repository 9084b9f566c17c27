//! Ripple Test - Shared test utilities for the Ripple event core.
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! ripple-test.workspace = true
//! ```
//!
//! Then use in your tests:
//!
//! ```rust,ignore
//! use ripple_events::EventNotifier;
//! use ripple_test::Recorder;
//!
//! #[test]
//! fn test_delivery() {
//!     let notifier = EventNotifier::new();
//!     let recorder = Recorder::new();
//!     notifier.on(recorder.receive());
//!
//!     notifier.send(1);
//!     assert_eq!(recorder.events(), vec![1]);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod harness;
pub mod recorder;

pub use harness::*;
pub use recorder::*;
