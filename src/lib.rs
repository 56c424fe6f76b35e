pub mod api;
pub mod config;
pub mod crypto;
pub mod error;
pub mod providers;
pub mod store;
pub mod tokens;
pub mod version;
pub mod webhooks;

pub use config::Config;
pub use error::SyncError;

use std::sync::Arc;

/// Shared application state passed to all API handlers.
pub struct AppState {
    pub config: Config,
    pub store: store::SyncStore,
    pub crypto: crypto::CryptoEngine,
    pub providers: providers::Providers,
    /// Resolved once at startup (explicit env → release tag → commit SHA).
    pub version: String,
}

pub type SharedState = Arc<AppState>;
