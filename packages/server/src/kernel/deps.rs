//! Server dependencies (using traits for testability)
//!
//! Central dependency container handed to routes and background services.
//! External services sit behind trait abstractions so tests can inject
//! fakes.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use openai_client::{ChatRequest, Message, OpenAIClient};
use sqlx::PgPool;

use crate::kernel::BaseAI;

/// Sampling parameters fixed for icebreaker generation.
const GENERATION_TEMPERATURE: f32 = 0.7;
const GENERATION_MAX_TOKENS: u32 = 200;

// =============================================================================
// OpenAIClient Adapter (implements BaseAI trait)
// =============================================================================

/// Wrapper around OpenAIClient that implements the BaseAI trait with the
/// fixed generation parameters.
pub struct OpenAiAdapter {
    client: OpenAIClient,
    model: String,
}

impl OpenAiAdapter {
    pub fn new(client: OpenAIClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl BaseAI for OpenAiAdapter {
    async fn complete_chat(&self, system: &str, user: &str) -> Result<String> {
        let response = self
            .client
            .chat_completion(
                ChatRequest::new(&self.model)
                    .message(Message::system(system))
                    .message(Message::user(user))
                    .temperature(GENERATION_TEMPERATURE)
                    .max_tokens(GENERATION_MAX_TOKENS),
            )
            .await?;

        Ok(response.content)
    }
}

// =============================================================================
// ServerDeps
// =============================================================================

/// Server dependencies accessible to routes and background services
#[derive(Clone)]
pub struct ServerDeps {
    pub db_pool: PgPool,
    /// AI client for icebreaker generation
    pub ai: Arc<dyn BaseAI>,
}

impl ServerDeps {
    /// Create new ServerDeps with the given dependencies
    pub fn new(db_pool: PgPool, ai: Arc<dyn BaseAI>) -> Self {
        Self { db_pool, ai }
    }
}
