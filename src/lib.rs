pub mod comms;
pub mod config;
pub mod error;
pub mod models;
pub mod security;
pub mod transport;
pub mod utils;
pub mod workflows;

pub use error::{ProxyError, ProxyResult};

// Crate version exposed for runtime queries
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
