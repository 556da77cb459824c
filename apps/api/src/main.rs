mod config;
mod errors;
mod llm_client;
mod models;
mod proposal;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::proposal::sessions::SessionRegistry;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Architect API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client (the API key is moved in and never logged)
    let llm = LlmClient::new(config.gemini_api_key)?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Build app state; abandoned sessions are swept in the background
    let sessions = Arc::new(SessionRegistry::new(llm));
    SessionRegistry::spawn_sweeper(&sessions);
    let state = AppState { sessions };

    // Build router; the browser front-end is served from another origin
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
