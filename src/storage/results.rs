//! Storage result types
//!
//! Catalog entries and the paginated page wrapping them. All of these are
//! computed fresh from the filesystem on every call.

use std::fs::Metadata;
use std::io;
use std::ops::Range;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A directory under the store root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub name: String,
    pub size: u64,
}

/// A regular file inside a bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
    #[serde(rename = "modtime")]
    pub mod_time: String,
}

impl FileEntry {
    pub fn from_metadata(name: impl Into<String>, metadata: &Metadata) -> io::Result<Self> {
        let modified: DateTime<Utc> = metadata.modified()?.into();
        Ok(Self {
            name: name.into(),
            size: metadata.len(),
            mod_time: modified.to_rfc3339_opts(SecondsFormat::Secs, true),
        })
    }
}

/// One window of a catalog listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    /// Matching items before the window was applied.
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(mut items: Vec<T>, offset: usize, limit: usize) -> Self {
        let total = items.len();
        let range = window(total, offset, limit);
        items.truncate(range.end);
        let items = items.split_off(range.start);
        Self {
            total,
            offset,
            limit,
            bucket: None,
            pattern: None,
            items,
        }
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    pub fn with_pattern(mut self, pattern: Option<&str>) -> Self {
        self.pattern = pattern.filter(|p| !p.is_empty()).map(str::to_string);
        self
    }
}

/// `[offset, offset + limit)` clamped to `[0, total]`.
pub fn window(total: usize, offset: usize, limit: usize) -> Range<usize> {
    let start = offset.min(total);
    let end = offset.saturating_add(limit).min(total);
    start..end
}
