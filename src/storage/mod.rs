//! File system storage management
//!
//! Path sandboxing, directory walking, and the bucket and file catalogs.

pub mod filesystem;
pub mod operations;
pub mod results;
pub mod validation;

pub use operations::{MAX_BUCKET_DEPTH, collect_buckets, collect_files, list_buckets, list_files};
pub use results::{Bucket, FileEntry, Page};
pub use validation::Sandbox;
