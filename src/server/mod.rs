//! Server core functionality
//!
//! HTTP listener, routing and the state shared by every request.

pub mod core;
pub mod state;

pub use self::core::{Server, router};
pub use state::AppState;
