pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod server;
pub mod storage;
pub mod transfer;

pub use error::StoreError;
pub use server::Server;
pub use storage::Sandbox;
