use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub openai_api_key: String,
    /// Shared secret expected as a bearer token on /hooks routes
    pub worker_shared_secret: String,
    /// Model used for icebreaker generation
    pub icebreaker_model: String,
    /// Per-invocation wall-clock ceiling, in seconds
    pub icebreaker_time_budget_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            openai_api_key: env::var("OPENAI_API_KEY").context("OPENAI_API_KEY must be set")?,
            worker_shared_secret: env::var("WORKER_SHARED_SECRET")
                .context("WORKER_SHARED_SECRET must be set")?,
            icebreaker_model: env::var("ICEBREAKER_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            icebreaker_time_budget_secs: env::var("ICEBREAKER_TIME_BUDGET_SECS")
                .unwrap_or_else(|_| "110".to_string())
                .parse()
                .context("ICEBREAKER_TIME_BUDGET_SECS must be a valid number")?,
        })
    }
}
