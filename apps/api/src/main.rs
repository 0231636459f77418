mod config;
mod db;
mod errors;
mod generation;
mod jobs;
mod llm_client;
mod models;
mod poller;
mod routes;
mod state;
mod store;
mod transport;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::generation::worker::Pipeline;
use crate::llm_client::{LlmClient, TextModel};
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{ContentStore, JobStore, PgContentStore, PgJobStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (panics on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Personalization API v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    let jobs: Arc<dyn JobStore> = Arc::new(PgJobStore::new(db.clone()));
    let content: Arc<dyn ContentStore> = Arc::new(PgContentStore::new(db));

    // Initialize LLM client. A missing credential is not fatal: every
    // generation run then takes the templated-content path instead.
    let model: Option<Arc<dyn TextModel>> = match &config.groq_api_key {
        Some(key) => {
            info!("LLM client initialized (model: {})", llm_client::MODEL);
            Some(Arc::new(LlmClient::new(key.clone())))
        }
        None => {
            warn!("GROQ_API_KEY is not set; generation will produce templated content");
            None
        }
    };

    let pipeline = Pipeline::new(jobs.clone(), content.clone(), model);

    // Build app state
    let state = AppState {
        jobs,
        content,
        pipeline,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
