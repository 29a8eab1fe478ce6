//! Equality engine for change detection.
//!
//! This module contains the pure core the store relies on:
//! - Identity comparison via the `Same` trait
//! - Shallow structural comparison via the `Shallow` trait
//! - Macros for opting user types into both
//!
//! Nothing in this module has side effects.

mod identity;
mod macros;
mod shallow;

pub use identity::Same;
pub use shallow::{mapping_eq, sequence_eq, set_eq, shallow_equal, Category, Shallow};
