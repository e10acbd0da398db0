//! Path validation
//!
//! Turns untrusted bucket and file names into paths inside the store root.
//! Every operation goes through [`Sandbox`], so containment is checked the
//! same way for listing, upload, download and delete.

use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::StoreError;

/// The store root and the only place paths are derived from.
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    /// Wrap an absolute root directory. No I/O is performed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        if !root.is_absolute() {
            return Err(StoreError::validation(
                "store root",
                format!("{} is not an absolute path", root.display()),
            ));
        }
        Ok(Self {
            root: normalize(&root),
        })
    }

    /// Canonicalize an existing directory and use it as the store root.
    pub fn open(root: &Path) -> io::Result<Self> {
        let root = root.canonicalize()?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("store root {} is not a directory", root.display()),
            ));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a bucket name to its directory. The empty name is the root itself.
    pub fn resolve_bucket(&self, bucket: &str) -> Result<PathBuf, StoreError> {
        check_characters("bucket", bucket)?;
        let path = join_lexically(&self.root, bucket);
        if !self.contains(&path) {
            return Err(StoreError::validation("bucket", "path escapes the store root"));
        }
        Ok(path)
    }

    /// Resolve a single-segment file name inside a bucket.
    pub fn resolve_file(&self, bucket: &str, filename: &str) -> Result<PathBuf, StoreError> {
        let bucket_path = self.resolve_bucket(bucket)?;
        let segment = single_segment("filename", filename)?;
        if matches!(segment, "." | "..") {
            return Err(StoreError::validation(
                "filename",
                format!("{filename} is not a file name"),
            ));
        }
        Ok(bucket_path.join(segment))
    }

    /// Resolve a bare `bucket/.../file` path as used by direct downloads.
    pub fn resolve_direct(&self, path: &str) -> Result<PathBuf, StoreError> {
        check_characters("path", path)?;
        let resolved = join_lexically(&self.root, path);
        if resolved == self.root || !self.contains(&resolved) {
            return Err(StoreError::validation("path", "path escapes the store root"));
        }
        Ok(resolved)
    }

    /// Component-wise containment: `/data-evil` is not inside `/data`.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.root)
    }

    /// Bucket name of a directory under the root, `/`-separated.
    pub fn bucket_name(&self, dir: &Path) -> Option<String> {
        let relative = dir.strip_prefix(&self.root).ok()?;
        let segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if segments.is_empty() {
            None
        } else {
            Some(segments.join("/"))
        }
    }
}

/// Number of real segments in a `/`-separated name.
pub fn segment_count(name: &str) -> usize {
    name.split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .count()
}

/// Validate a glob pattern that must stay within one directory level.
/// An empty pattern yields `None`.
pub fn single_segment_pattern(pattern: &str) -> Result<Option<&str>, StoreError> {
    if pattern.is_empty() {
        return Ok(None);
    }
    single_segment("pattern", pattern).map(Some)
}

fn single_segment<'a>(field: &'static str, name: &'a str) -> Result<&'a str, StoreError> {
    check_characters(field, name)?;
    if segment_count(name) != 1 {
        return Err(StoreError::validation(
            field,
            format!("{name} must be a single path segment"),
        ));
    }
    name.split('/')
        .find(|s| !s.is_empty() && *s != ".")
        .ok_or_else(|| StoreError::validation(field, "empty name"))
}

fn check_characters(field: &'static str, name: &str) -> Result<(), StoreError> {
    if name.contains('\0') {
        return Err(StoreError::validation(field, "contains a NUL byte"));
    }
    Ok(())
}

/// Join `/`-separated segments onto `base` the way a path clean would:
/// empty and `.` segments vanish, `..` drops the last component. A leading
/// slash does not make the candidate absolute.
fn join_lexically(base: &Path, candidate: &str) -> PathBuf {
    let mut path = base.to_path_buf();
    for segment in candidate.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                path.pop();
            }
            name => path.push(name),
        }
    }
    path
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sandbox() -> Sandbox {
        Sandbox::new("/data").unwrap()
    }

    #[test]
    fn test_resolve_bucket() {
        let sb = sandbox();
        assert_eq!(sb.resolve_bucket("photos").unwrap(), PathBuf::from("/data/photos"));
        assert_eq!(sb.resolve_bucket("/photos/").unwrap(), PathBuf::from("/data/photos"));
        assert_eq!(sb.resolve_bucket("a/./b//c").unwrap(), PathBuf::from("/data/a/b/c"));
        assert_eq!(sb.resolve_bucket("a/../b").unwrap(), PathBuf::from("/data/b"));
        assert_eq!(sb.resolve_bucket("").unwrap(), PathBuf::from("/data"));
    }

    #[test]
    fn test_traversal_is_rejected() {
        let sb = sandbox();
        for bucket in ["..", "../evil", "a/../../etc", "../data-evil", "a/b/../../../x"] {
            let err = sb.resolve_bucket(bucket).unwrap_err();
            assert!(
                matches!(err, StoreError::Validation { field: "bucket", .. }),
                "{bucket} was accepted"
            );
        }
        assert!(sb.resolve_file("../evil", "x").is_err());
        assert!(sb.resolve_direct("a/../../etc/passwd").is_err());
        assert!(sb.resolve_direct("../data-evil/x").is_err());
    }

    #[test]
    fn test_file_name_must_be_single_segment() {
        let sb = sandbox();
        assert_eq!(
            sb.resolve_file("photos", "a.jpg").unwrap(),
            PathBuf::from("/data/photos/a.jpg")
        );
        assert!(sb.resolve_file("photos", "a/../../etc/passwd").is_err());
        assert!(sb.resolve_file("photos", "sub/a.jpg").is_err());
        assert!(sb.resolve_file("photos", "..").is_err());
        assert!(sb.resolve_file("photos", "").is_err());
        assert!(sb.resolve_file("photos", "a\0b").is_err());
    }

    #[test]
    fn test_direct_path() {
        let sb = sandbox();
        assert_eq!(
            sb.resolve_direct("/photos/a.jpg").unwrap(),
            PathBuf::from("/data/photos/a.jpg")
        );
        assert!(sb.resolve_direct("").is_err());
        assert!(sb.resolve_direct("photos/..").is_err());
    }

    #[test]
    fn test_bucket_name() {
        let sb = sandbox();
        assert_eq!(sb.bucket_name(Path::new("/data/a/b")).as_deref(), Some("a/b"));
        assert_eq!(sb.bucket_name(Path::new("/data")), None);
        assert_eq!(sb.bucket_name(Path::new("/data-evil/a")), None);
    }

    #[test]
    fn test_segment_count() {
        assert_eq!(segment_count("*.jpg"), 1);
        assert_eq!(segment_count("./*.jpg"), 1);
        assert_eq!(segment_count("a/*.jpg"), 2);
        assert_eq!(segment_count(""), 0);
    }

    #[test]
    fn test_single_segment_pattern() {
        assert_eq!(single_segment_pattern("").unwrap(), None);
        assert_eq!(single_segment_pattern("*.jpg").unwrap(), Some("*.jpg"));
        assert!(single_segment_pattern("*/*.jpg").is_err());
    }

    #[test]
    fn test_relative_root_rejected() {
        assert!(Sandbox::new("data").is_err());
    }
}
