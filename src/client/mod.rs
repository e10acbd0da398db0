//! HTTP client
//!
//! Talks to a running store over its `/api/v1` routes. Uploads and downloads
//! are streamed, so file size is bounded by disk rather than memory.

pub mod api;
pub mod error;

pub use api::StoreClient;
pub use error::ClientError;
