//! Result envelope
//!
//! Every JSON reply is wrapped as `{error, message?, result?}`. Internal
//! error types never leave the process; only their description does.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::error::handlers::{error_to_status, handle_error};

#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(result: T) -> Self {
        Self {
            error: false,
            message: None,
            result: Some(result),
        }
    }

    /// Log `err` and wrap its description.
    pub fn fail(err: &StoreError) -> Self {
        handle_error(err);
        Self {
            error: true,
            message: Some(err.describe()),
            result: None,
        }
    }
}

impl Envelope<()> {
    /// Informational reply without a result.
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            error: false,
            message: Some(text.into()),
            result: None,
        }
    }
}

/// Turn an operation outcome into an HTTP reply.
pub fn reply<T: Serialize>(outcome: Result<T, StoreError>) -> Response {
    match outcome {
        Ok(result) => (StatusCode::OK, Json(Envelope::ok(result))).into_response(),
        Err(err) => (error_to_status(&err), Json(Envelope::<T>::fail(&err))).into_response(),
    }
}
