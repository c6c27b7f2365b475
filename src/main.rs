//! Trady Backend Server

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use trady_server::app_state::AppState;
use trady_server::config::AppConfig;
use trady_server::create_router;
use trady_server::jobs::top_sellers;
use trady_server::store::{Database, MemoryDatabase, PgDatabase};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;

    let db: Arc<dyn Database> = match &config.database_url {
        Some(url) => {
            let db = PgDatabase::connect(url, config.db_max_connections)
                .await
                .context("Failed to connect to database")?;
            info!("Connected to Postgres");
            Arc::new(db)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            Arc::new(MemoryDatabase::new())
        }
    };

    let state = AppState::new(db, &config);
    let _scheduler = top_sellers::schedule(state.top_seller_job.clone(), &config.top_seller_cron).await?;

    let app = create_router(state, config.cors_allowed_origins.as_deref());

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server starting on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
