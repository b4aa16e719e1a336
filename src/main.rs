use anyhow::Context;
use tracing_subscriber::EnvFilter;

use mindlog_api::config::AppConfig;
use mindlog_api::database::{DatabaseManager, PgStore, Stores};
use mindlog_api::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mindlog_api=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env();
    tracing::info!("Starting MindLog API in {:?} mode", config.environment);

    let stores = match config.database.url.as_deref() {
        Some(url) => {
            let pool = DatabaseManager::connect(&config.database)
                .await
                .with_context(|| {
                    format!(
                        "failed to connect to {}",
                        DatabaseManager::redacted_url(url)
                    )
                })?;
            DatabaseManager::migrate(&pool).await?;
            Stores::postgres(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage");
            Stores::memory()
        }
    };

    let bind_addr = config.bind_address();
    let state = AppState::new(config, stores).context("invalid security configuration")?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("MindLog API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
