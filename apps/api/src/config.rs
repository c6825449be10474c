use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_model: String,
    pub jwt_secret: String,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub stripe_price_monthly: String,
    pub stripe_price_lifetime: String,
    /// Base URL of the frontend; checkout redirects land here.
    pub client_url: String,
    pub allowed_origins: Vec<String>,
    pub pdf_renderer_bin: String,
    pub pdf_render_timeout: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            openai_api_key: require_env("OPENAI_API_KEY")?,
            openai_model: env_or("OPENAI_MODEL", "gpt-4o"),
            jwt_secret: require_env("JWT_SECRET")?,
            stripe_secret_key: require_env("STRIPE_SECRET_KEY")?,
            stripe_webhook_secret: require_env("STRIPE_WEBHOOK_SECRET")?,
            stripe_price_monthly: env_or("STRIPE_PRICE_MONTHLY", "price_monthly"),
            stripe_price_lifetime: env_or("STRIPE_PRICE_LIFETIME", "price_lifetime"),
            client_url: env_or("CLIENT_URL", "http://localhost:3000")
                .trim_end_matches('/')
                .to_string(),
            allowed_origins: parse_origins(&env_or("ALLOWED_ORIGINS", "http://localhost:5173")),
            pdf_renderer_bin: env_or("PDF_RENDERER_BIN", "wkhtmltopdf"),
            pdf_render_timeout: Duration::from_secs(
                env_or("PDF_RENDER_TIMEOUT_SECS", "25")
                    .parse::<u64>()
                    .context("PDF_RENDER_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            port: env_or("PORT", "3000")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Splits a comma-separated origin list, dropping blanks.
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_end_matches('/').to_string())
        .collect()
}
