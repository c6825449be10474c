mod api;
mod config;
mod contracts;
mod errors;
mod llm_client;
mod offers;
mod payments;
mod routes;
mod state;
mod users;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use std::net::SocketAddr;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::contracts::render::WkhtmltopdfRenderer;
use crate::contracts::store::InMemoryContractStore;
use crate::llm_client::LlmClient;
use crate::payments::gateway::StripeClient;
use crate::payments::plans::PlanCatalog;
use crate::payments::signature::SignatureVerifier;
use crate::payments::store::InMemorySubscriptionStore;
use crate::routes::build_router;
use crate::state::AppState;
use crate::users::store::InMemoryUserStore;
use crate::users::token::TokenService;

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("clatract_api={},tower_http={}", &config.rust_log, &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Clatract API v{}", env!("CARGO_PKG_VERSION"));

    let llm = LlmClient::new(config.openai_api_key.clone(), config.openai_model.clone())?;
    info!("LLM client initialized (model: {})", llm.model());

    let renderer =
        WkhtmltopdfRenderer::from_command_line(&config.pdf_renderer_bin, config.pdf_render_timeout);
    info!(
        "PDF renderer: {} (timeout {:?})",
        config.pdf_renderer_bin, config.pdf_render_timeout
    );

    let payments = StripeClient::new(config.stripe_secret_key.clone())?;

    // Argon2 hashing of the demo account runs once at startup.
    let users = InMemoryUserStore::with_demo_user()?;

    let state = AppState {
        llm: Arc::new(llm),
        renderer: Arc::new(renderer),
        contracts: Arc::new(InMemoryContractStore::with_sample()),
        users: Arc::new(users),
        tokens: TokenService::new(&config.jwt_secret),
        payments: Arc::new(payments),
        plans: PlanCatalog::new(
            config.stripe_price_monthly.clone(),
            config.stripe_price_lifetime.clone(),
        ),
        subscriptions: Arc::new(InMemorySubscriptionStore::default()),
        webhook_verifier: Arc::new(SignatureVerifier::new(&config.stripe_webhook_secret)),
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors(&config.allowed_origins)?);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// CORS restricted to the configured frontend origins, with credentials allowed.
fn build_cors(origins: &[String]) -> Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).with_context(|| format!("Invalid CORS origin '{origin}'"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true))
}
