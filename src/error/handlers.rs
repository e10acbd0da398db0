//! Error handlers
//!
//! Logs store errors and maps them onto HTTP status codes.

use axum::http::StatusCode;
use log::{error, warn};

use crate::error::types::StoreError;

/// Log a store error with full detail
pub fn handle_error(err: &StoreError) {
    match err {
        StoreError::Validation { .. } | StoreError::NotFound(_) => warn!("{err}"),
        _ => error!("Store error: {err}"),
    }
}

/// Convert error to HTTP status code
pub fn error_to_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::Validation { .. } => StatusCode::BAD_REQUEST,
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::NotARegularFile(_) => StatusCode::INTERNAL_SERVER_ERROR,
        StoreError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
