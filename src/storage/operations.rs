//! Storage operations
//!
//! Bucket and file catalogs: on-demand listings with glob filtering and
//! offset/limit pagination. These walk the filesystem synchronously.

use std::fs;
use std::io;

use globset::{GlobBuilder, GlobMatcher};
use log::{info, warn};

use crate::error::StoreError;
use crate::storage::filesystem::{directory_size, is_upload_temp, walk_directories};
use crate::storage::results::{Bucket, FileEntry, Page};
use crate::storage::validation::{Sandbox, single_segment_pattern};

/// Default bound on bucket nesting
pub const MAX_BUCKET_DEPTH: usize = 64;

/// Every bucket whose name matches `*pattern*`, in walk order.
///
/// `*` never matches `/`, so without a `/` in the pattern only top-level
/// buckets are found; `photos/*` reaches the buckets nested in `photos`. A
/// pattern that does not compile matches nothing.
pub fn collect_buckets(
    sandbox: &Sandbox,
    pattern: Option<&str>,
    max_depth: usize,
) -> Result<Vec<Bucket>, StoreError> {
    let root = sandbox.root();
    match fs::metadata(root) {
        Ok(metadata) if metadata.is_dir() => {}
        Ok(_) => return Err(StoreError::NotFound("store root".into())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(StoreError::NotFound("store root".into()));
        }
        Err(e) => return Err(e.into()),
    }

    let Some(matcher) = bucket_matcher(pattern.unwrap_or("")) else {
        return Ok(Vec::new());
    };

    let mut buckets = Vec::new();
    for directory in walk_directories(root, max_depth) {
        let Some(name) = sandbox.bucket_name(&directory) else {
            continue;
        };
        if !matcher.is_match(&name) {
            continue;
        }
        buckets.push(Bucket {
            size: directory_size(&directory),
            name,
        });
    }
    Ok(buckets)
}

/// Lists buckets as one page
pub fn list_buckets(
    sandbox: &Sandbox,
    pattern: Option<&str>,
    offset: usize,
    limit: usize,
    max_depth: usize,
) -> Result<Page<Bucket>, StoreError> {
    let buckets = collect_buckets(sandbox, pattern, max_depth)?;
    let page = Page::new(buckets, offset, limit).with_pattern(pattern);
    info!(
        "Listed buckets (pattern {:?}) - {} of {} matches",
        pattern.unwrap_or(""),
        page.items.len(),
        page.total
    );
    Ok(page)
}

/// Regular files of one bucket matching a single-segment glob, sorted by name.
///
/// The glob is used as given; `*.jpg` matches only names ending in `.jpg`.
pub fn collect_files(
    sandbox: &Sandbox,
    bucket: &str,
    pattern: Option<&str>,
) -> Result<Vec<FileEntry>, StoreError> {
    let bucket_path = sandbox.resolve_bucket(bucket)?;
    let pattern = single_segment_pattern(pattern.unwrap_or(""))?.unwrap_or("*");
    let matcher = compile(pattern, true)?;

    let entries = match fs::read_dir(&bucket_path) {
        Ok(entries) => entries,
        Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => {
            return Err(StoreError::NotFound(format!("bucket {bucket}")));
        }
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {e}", bucket_path.display());
                continue;
            }
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_upload_temp(&name) || !matcher.is_match(&name) {
            continue;
        }

        let metadata = match fs::metadata(entry.path()) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Failed to stat {}: {e}", entry.path().display());
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }
        match FileEntry::from_metadata(name, &metadata) {
            Ok(file) => files.push(file),
            Err(e) => warn!("Failed to read timestamps of {}: {e}", entry.path().display()),
        }
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// Lists files of a bucket as one page
pub fn list_files(
    sandbox: &Sandbox,
    bucket: &str,
    pattern: Option<&str>,
    offset: usize,
    limit: usize,
) -> Result<Page<FileEntry>, StoreError> {
    let files = collect_files(sandbox, bucket, pattern)?;
    let page = Page::new(files, offset, limit)
        .with_bucket(bucket)
        .with_pattern(pattern);
    info!(
        "Listed bucket {bucket:?} (pattern {:?}) - {} of {} files",
        pattern.unwrap_or("*"),
        page.items.len(),
        page.total
    );
    Ok(page)
}

fn bucket_matcher(pattern: &str) -> Option<GlobMatcher> {
    // Runs of `*` mean the same as one when `*` stops at `/`
    let mut core = String::with_capacity(pattern.len());
    let mut escaped = false;
    for c in pattern.trim_matches('*').chars() {
        if c == '*' && !escaped && core.ends_with('*') {
            continue;
        }
        escaped = c == '\\' && !escaped;
        core.push(c);
    }

    let wrapped = if core.is_empty() {
        "*".to_string()
    } else {
        format!("*{core}*")
    };
    match compile(&wrapped, true) {
        Ok(matcher) => Some(matcher),
        Err(e) => {
            warn!("Bucket pattern {pattern:?} matches nothing: {e}");
            None
        }
    }
}

fn compile(pattern: &str, literal_separator: bool) -> Result<GlobMatcher, StoreError> {
    GlobBuilder::new(pattern)
        .literal_separator(literal_separator)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|e| StoreError::validation("pattern", e.to_string()))
}
