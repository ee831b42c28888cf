mod config;
mod db;
mod errors;
mod identity;
mod jobs;
mod llm_client;
mod models;
mod profiles;
mod routes;
mod signin;
mod skills;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::identity::toolkit::IdentityToolkit;
use crate::llm_client::LlmClient;
use crate::profiles::store::PgProfileStore;
use crate::routes::build_router;
use crate::skills::LlmSkillSuggester;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Fails fast on missing required env vars
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Handyman API v{}", env!("CARGO_PKG_VERSION"));

    // PostgreSQL (migrations run inside create_pool)
    let db = create_pool(&config.database_url).await?;

    let identity = IdentityToolkit::new(
        config.identity_api_key.clone(),
        config.identity_api_base.clone(),
    )?;
    info!("Identity provider client initialized ({})", config.identity_api_base);

    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let state = AppState {
        profiles: Arc::new(PgProfileStore::new(db.clone())),
        db,
        identity: Arc::new(identity),
        skills: Arc::new(LlmSkillSuggester::new(llm)),
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
