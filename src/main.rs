mod app_state;
mod config;
mod db;
mod error;
mod friends;
mod groups;
mod handlers;
mod middlewares;
mod models;
mod queries;
mod routes;
mod store;

use anyhow::{Context, Result};
use tower_sessions::SessionManagerLayer;
use tower_sessions_sqlx_store::PostgresStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::config::Config;
use crate::store::postgres::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env()?;
    let pool = db::connect_to_db(&config.database_url, config.max_connections).await?;

    let session_store = PostgresStore::new(pool.clone());
    session_store
        .migrate()
        .await
        .context("Failed to migrate session store")?;

    let state = AppState::from_store(PgStore::new(pool));
    let app = routes::create_routes()
        .layer(SessionManagerLayer::new(session_store))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
