//! Bucket store - Entry Point
//!
//! Serves a directory tree of buckets over HTTP.

use log::{error, info};

use bucket_store::Server;
use bucket_store::config::StoreConfig;

#[tokio::main]
async fn main() {
    // Initialize the logger (env_logger picks up RUST_LOG environment variable)
    env_logger::init();

    let config = match StoreConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    info!("Launching bucket store...");

    let server = match Server::new(config).await {
        Ok(server) => server,
        Err(e) => {
            error!("Server startup failed: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = server.start().await {
        error!("Server stopped: {e}");
        std::process::exit(1);
    }
}
