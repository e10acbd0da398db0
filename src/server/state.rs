//! Shared request state
//!
//! Read-only after startup; cloned into every handler.

use std::sync::Arc;

use crate::config::StoreConfig;
use crate::storage::Sandbox;

#[derive(Debug, Clone)]
pub struct AppState {
    pub sandbox: Arc<Sandbox>,
    pub config: Arc<StoreConfig>,
}

impl AppState {
    pub fn new(sandbox: Sandbox, config: StoreConfig) -> Self {
        Self {
            sandbox: Arc::new(sandbox),
            config: Arc::new(config),
        }
    }
}
