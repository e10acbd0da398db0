use log::{error, info};
use std::io;
use std::net::SocketAddr;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tokio::net::TcpListener;

use crate::config::StoreConfig;
use crate::protocol::handlers::{
    handle_bucket_list, handle_bucket_page, handle_file_down, handle_file_drop, handle_file_get,
    handle_file_list, handle_file_page, handle_file_put, handle_hello,
};
use crate::server::state::AppState;
use crate::storage::Sandbox;

const API_PREFIX: &str = "/api/v1";

/// Slack on top of the upload limit for multipart framing and text fields
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

pub struct Server {
    listener: TcpListener,
    state: AppState,
}

impl Server {
    /// Prepares the store root and binds the listener.
    pub async fn new(config: StoreConfig) -> io::Result<Self> {
        let root = config.store_root_path();
        if let Err(e) = tokio::fs::create_dir_all(&root).await {
            error!("Failed to create store root {}: {e}", root.display());
            return Err(e);
        }
        let sandbox = Sandbox::open(&root)?;
        info!("Store root directory: {}", sandbox.root().display());

        let addr = config
            .socket_addr()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => {
                info!("Server bound to {addr}");
                listener
            }
            Err(e) => {
                error!("Failed to bind to {addr}: {e}");
                return Err(e);
            }
        };

        Ok(Self {
            listener,
            state: AppState::new(sandbox, config),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn start(self) -> io::Result<()> {
        info!("Starting bucket store on {}", self.local_addr()?);
        axum::serve(self.listener, router(self.state)).await
    }
}

/// All routes of the store API.
pub fn router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.config.max_upload_size_bytes())
        .unwrap_or(usize::MAX)
        .saturating_add(FORM_OVERHEAD_BYTES);

    let api = Router::new()
        .route("/hello", get(handle_hello))
        .route("/bucket/list", get(handle_bucket_list).post(handle_bucket_list))
        .route("/bucket/pagelist", post(handle_bucket_page))
        .route("/file/list", post(handle_file_list))
        .route("/file/pagelist", post(handle_file_page))
        .route("/file/put", post(handle_file_put))
        .route("/file/get", post(handle_file_get))
        .route("/file/down/*path", get(handle_file_down))
        .route("/file/drop", post(handle_file_drop));

    Router::new()
        .nest(API_PREFIX, api)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
