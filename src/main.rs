use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use activity_sync::crypto::CryptoEngine;
use activity_sync::store::SyncStore;
use activity_sync::{api, providers, version, AppState, Config, SharedState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "activity_sync=info".into()),
        )
        .init();

    // Load config
    let config = Config::from_env()?;
    info!("Listening on {}:{}", config.host, config.port);

    // Initialize components
    let crypto = CryptoEngine::new(&config.master_key)?;
    let store = SyncStore::new(&config.database_url).await?;
    store.migrate().await?;
    info!("Database connected and migrated ✓");

    let providers = providers::from_config(&config);
    info!("Registered {} OAuth providers", providers.registry.count());

    let version = version::resolve(&config).await;
    info!("activity-sync v{version}");

    // Build shared state
    let state: SharedState = Arc::new(AppState {
        config: config.clone(),
        store,
        crypto,
        providers,
        version,
    });

    // Build router
    let app = api::router(state);

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server ready ✓");
    axum::serve(listener, app).await?;

    Ok(())
}
