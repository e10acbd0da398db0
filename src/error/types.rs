//! Error types
//!
//! Every store operation fails with a [`StoreError`]. Catalog entries that
//! cannot be inspected are logged and skipped instead of surfacing here.

use std::fmt;
use std::io;

/// Store module errors
#[derive(Debug)]
pub enum StoreError {
    /// Malformed or out-of-root bucket, file name or pattern.
    Validation { field: &'static str, reason: String },
    /// The referenced bucket or file does not exist.
    NotFound(String),
    /// Something other than a regular file sits at the requested path.
    NotARegularFile(String),
    IoError(io::Error),
}

impl StoreError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        StoreError::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Message safe to hand to a remote caller.
    ///
    /// I/O failures are collapsed into a generic description; the full error
    /// only goes to the log.
    pub fn describe(&self) -> String {
        match self {
            StoreError::IoError(_) | StoreError::NotARegularFile(_) => {
                "storage operation failed".to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Validation { field, reason } => write!(f, "wrong {field}: {reason}"),
            StoreError::NotFound(what) => write!(f, "{what} not found"),
            StoreError::NotARegularFile(what) => write!(f, "not a regular file: {what}"),
            StoreError::IoError(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(error: io::Error) -> Self {
        StoreError::IoError(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_names_field() {
        let err = StoreError::validation("bucket", "path escapes the store root");
        assert_eq!(err.to_string(), "wrong bucket: path escapes the store root");
        assert_eq!(err.describe(), err.to_string());
    }

    #[test]
    fn test_io_error_is_described_generically() {
        let err = StoreError::from(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "open /srv/store/photos: permission denied",
        ));
        assert!(err.to_string().contains("/srv/store"));
        assert_eq!(err.describe(), "storage operation failed");
    }
}
