use std::net::SocketAddr;

use tracing::info;
use tracing_subscriber::EnvFilter;

use formlog_server::config::AppConfig;
use formlog_server::state::AppState;
use formlog_server::{build_router, database, storage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::load()?;

    let db = database::init_db(&config.database.url).await?;
    info!("Database connected and schema synced");

    let blob_store = storage::init_blob_store(&config.storage).await?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let state = AppState {
        db,
        config,
        blob_store,
    };
    let app = build_router(state);

    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
