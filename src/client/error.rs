//! Client error types

use std::error::Error;
use std::fmt;
use std::io;

use reqwest::StatusCode;

#[derive(Debug)]
pub enum ClientError {
    /// Request could not be sent or its reply could not be read
    Http(reqwest::Error),
    /// The store answered with an error envelope
    Store { status: StatusCode, message: String },
    /// The store answered without an envelope
    Status(StatusCode),
    Decode(serde_json::Error),
    InvalidArgument(String),
    IoError(io::Error),
}

impl ClientError {
    /// HTTP status of a refused request, if the store answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Store { status, .. } | ClientError::Status(status) => Some(*status),
            ClientError::Http(e) => e.status(),
            _ => None,
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Http(e) => write!(f, "request failed: {e}"),
            ClientError::Store { status, message } => write!(f, "{status}: {message}"),
            ClientError::Status(status) => write!(f, "{status}"),
            ClientError::Decode(e) => write!(f, "unreadable reply: {e}"),
            ClientError::InvalidArgument(reason) => write!(f, "invalid argument: {reason}"),
            ClientError::IoError(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl Error for ClientError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ClientError::Http(e) => Some(e),
            ClientError::Decode(e) => Some(e),
            ClientError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Http(err)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err)
    }
}

impl From<io::Error> for ClientError {
    fn from(err: io::Error) -> Self {
        ClientError::IoError(err)
    }
}
