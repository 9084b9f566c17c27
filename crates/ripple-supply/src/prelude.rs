//! Prelude module - commonly used types for convenient import.
//!
//! Use `use ripple_supply::prelude::*;` to import all essential types.

pub use crate::{OffReason, Supply, SupplyError};
