use anyhow::Context;
use tracing_subscriber::EnvFilter;

use tagline_web::{config, routes, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up JWT_SECRET, BACKEND_URL, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::config();
    tracing::info!("Starting Tagline web tier in {:?} mode", config.environment);

    let state = AppState::new(config.clone()).context("failed to build backend client")?;
    let app = routes::app(state);

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Tagline web tier listening on http://{}", bind_addr);
    tracing::info!("Proxying backend at {}", config.backend.base_url);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
