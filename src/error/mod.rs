//! Error handling
//!
//! Defines the store error type and how it is reported at the boundary.

pub mod handlers;
pub mod types;

pub use types::*;
