//! HTTP protocol
//!
//! Request forms, the result envelope, and the route handlers.

pub mod commands;
pub mod handlers;
pub mod responses;

pub use responses::{Envelope, reply};
