//! Configuration management for the bucket store
//!
//! Values come from built-in defaults, then an optional `config.toml`, then
//! `BUCKET_STORE_*` environment variables. Everything here is read once at
//! startup.

use config::{Config, ConfigBuilder, ConfigError, Environment, File, builder::DefaultState};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::storage::MAX_BUCKET_DEPTH;
use crate::transfer::{BUFFER_SIZE, TransferOptions};

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "BUCKET_STORE";

/// Config file looked up when none is given, without extension
pub const DEFAULT_CONFIG_FILE: &str = "config";

/// Complete store configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// IP address the HTTP listener binds to
    pub bind_address: String,

    /// HTTP port
    pub port: u16,

    /// Directory that holds every bucket
    pub store_root: String,

    /// Deepest directory level reported as a bucket
    pub max_bucket_depth: usize,

    /// Chunk size for uploads and downloads
    pub buffer_size: usize,

    /// Largest accepted upload in MB
    pub max_upload_size_mb: u64,
}

impl StoreConfig {
    /// Load configuration from `config.toml` with environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(format!("{ENV_PREFIX}_CONFIG"))
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&path)
    }

    /// Load configuration from the given file (missing files are allowed)
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let settings = defaults()?
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let config: StoreConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Message("port cannot be 0".into()));
        }

        if self.store_root.trim().is_empty() {
            return Err(ConfigError::Message("store_root cannot be empty".into()));
        }

        if self.max_bucket_depth == 0 {
            return Err(ConfigError::Message(
                "max_bucket_depth must be greater than 0".into(),
            ));
        }

        if self.buffer_size == 0 {
            return Err(ConfigError::Message(
                "buffer_size must be greater than 0".into(),
            ));
        }

        if self.max_upload_size_mb == 0 {
            return Err(ConfigError::Message(
                "max_upload_size_mb must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Bind address and port as a socket address
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.bind_address, self.port).parse()
    }

    /// Get store root as PathBuf
    pub fn store_root_path(&self) -> PathBuf {
        PathBuf::from(&self.store_root)
    }

    /// Get maximum upload size in bytes
    pub fn max_upload_size_bytes(&self) -> u64 {
        self.max_upload_size_mb.saturating_mul(1024 * 1024)
    }

    pub fn transfer_options(&self) -> TransferOptions {
        TransferOptions {
            buffer_size: self.buffer_size,
            max_upload_bytes: Some(self.max_upload_size_bytes()),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8080,
            store_root: "./store".to_string(),
            max_bucket_depth: MAX_BUCKET_DEPTH,
            buffer_size: BUFFER_SIZE,
            max_upload_size_mb: 1024,
        }
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let fallback = StoreConfig::default();
    Config::builder()
        .set_default("bind_address", fallback.bind_address)?
        .set_default("port", i64::from(fallback.port))?
        .set_default("store_root", fallback.store_root)?
        .set_default("max_bucket_depth", fallback.max_bucket_depth as i64)?
        .set_default("buffer_size", fallback.buffer_size as i64)?
        .set_default("max_upload_size_mb", fallback.max_upload_size_mb as i64)
}
