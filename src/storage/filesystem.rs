//! File system operations
//!
//! Directory walking, size accounting and upload temporaries.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use log::warn;
use walkdir::WalkDir;

/// Suffix of in-progress upload files
pub const UPLOAD_SUFFIX: &str = ".upload";

static UPLOAD_SEQ: AtomicU64 = AtomicU64::new(0);

/// Every directory below `root` down to `max_depth` levels, the root excluded.
///
/// Entries are visited pre-order, sorted by name at each level, so the order
/// is stable for an unchanged tree. Symbolic links are not followed.
pub fn walk_directories(root: &Path, max_depth: usize) -> Vec<PathBuf> {
    let mut directories = Vec::new();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth)
        .follow_links(false)
        .sort_by_file_name();

    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_dir() => directories.push(entry.into_path()),
            Ok(_) => {}
            Err(e) => warn!("Skipping unreadable entry under {}: {e}", root.display()),
        }
    }
    directories
}

/// Sum of regular file sizes beneath `dir`, recursively.
pub fn directory_size(dir: &Path) -> u64 {
    let mut size = 0;
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {e}", dir.display());
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        match entry.metadata() {
            Ok(metadata) => size += metadata.len(),
            Err(e) => warn!("Failed to stat {}: {e}", entry.path().display()),
        }
    }
    size
}

/// Hidden sibling that an upload is written to before it is renamed into place.
pub fn upload_temp_path(final_path: &Path) -> PathBuf {
    let name = final_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    final_path.with_file_name(temp_name(&name))
}

/// Hidden file in `dir` for an upload whose destination is not known yet.
pub fn staging_path(dir: &Path) -> PathBuf {
    dir.join(temp_name("staged"))
}

fn temp_name(name: &str) -> String {
    let pid = std::process::id();
    let seq = UPLOAD_SEQ.fetch_add(1, Ordering::Relaxed);
    format!(".{name}.{pid}-{seq}{UPLOAD_SUFFIX}")
}

/// Whether a directory entry name belongs to an upload still in flight.
pub fn is_upload_temp(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(UPLOAD_SUFFIX)
}
