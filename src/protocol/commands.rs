//! Request bodies
//!
//! JSON forms accepted by the HTTP routes. Missing fields take their
//! defaults, matching how the web front end and CLI client post them.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Body of `bucket/pagelist`
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketPageRequest {
    pub pattern: String,
    pub offset: usize,
    pub limit: usize,
}

/// Body of `file/list`
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileListRequest {
    pub bucket: String,
    pub pattern: String,
}

/// Body of `file/pagelist`
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePageRequest {
    pub bucket: String,
    pub pattern: String,
    pub offset: usize,
    pub limit: usize,
}

/// Body of `file/get` and `file/drop`
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRequest {
    pub bucket: String,
    pub filename: String,
}

impl FileRequest {
    /// The file name, which is required.
    pub fn filename(&self) -> Result<&str, StoreError> {
        required("filename", &self.filename)
    }
}

pub fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, StoreError> {
    if value.is_empty() {
        Err(StoreError::validation(field, "field is required"))
    } else {
        Ok(value)
    }
}

/// Empty strings mean "no pattern".
pub fn optional(value: &str) -> Option<&str> {
    if value.is_empty() { None } else { Some(value) }
}
