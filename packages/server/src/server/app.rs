//! Application setup and server configuration.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use openai_client::OpenAIClient;
use sqlx::PgPool;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::domains::icebreaker::{
    IcebreakerWorker, IcebreakerWorkerConfig, PostgresIcebreakerStore,
};
use crate::kernel::{BaseAI, IcebreakerDispatcher, OpenAiAdapter, ServerDeps};
use crate::server::middleware::shared_secret_middleware;
use crate::server::routes::{
    generate_icebreakers_handler, health_handler, import_leads_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AxumAppState {
    pub deps: Arc<ServerDeps>,
    pub worker: Arc<IcebreakerWorker>,
}

/// Build the Axum application router.
///
/// Also spawns the icebreaker dispatcher as a background task so queued
/// jobs are picked up without an external scheduler.
pub fn build_app(pool: PgPool, config: &Config) -> Router {
    // AI client shared by the worker and any future routes
    let openai_client = OpenAIClient::new(config.openai_api_key.clone());
    let ai: Arc<dyn BaseAI> =
        Arc::new(OpenAiAdapter::new(openai_client, &config.icebreaker_model));

    let deps = Arc::new(ServerDeps::new(pool.clone(), ai.clone()));

    // Generation worker over the Postgres store
    let store = Arc::new(PostgresIcebreakerStore::new(pool.clone()));
    let worker = Arc::new(IcebreakerWorker::with_config(
        store,
        ai,
        IcebreakerWorkerConfig {
            time_budget: Duration::from_secs(config.icebreaker_time_budget_secs),
            ..Default::default()
        },
    ));

    // Spawn the dispatcher that delivers invocations for queued jobs
    let dispatcher = IcebreakerDispatcher::new(pool.clone(), worker.clone());
    tokio::spawn(async move {
        if let Err(e) = dispatcher.run().await {
            tracing::error!(error = %e, "icebreaker dispatcher exited with error");
        }
    });

    let app_state = AxumAppState { deps, worker };

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    // Rate limiting for webhook routes: 10/sec with burst of 20 per IP
    let rate_limit_config = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .use_headers() // Extract IP from X-Forwarded-For header
            .finish()
            .expect("Rate limiter configuration is valid and should never fail"),
    );
    let rate_limit_layer = GovernorLayer {
        config: rate_limit_config,
    };

    // Webhook routes: shared-secret auth + rate limit
    let secret = Arc::new(config.worker_shared_secret.clone());
    let hooks = Router::new()
        .route("/icebreakers/generate", post(generate_icebreakers_handler))
        .route("/leads/import", post(import_leads_handler))
        .layer(middleware::from_fn(move |req, next| {
            shared_secret_middleware(secret.clone(), req, next)
        }))
        .layer(rate_limit_layer);

    Router::new()
        .nest("/hooks", hooks)
        // Health check (no auth, no rate limit)
        .route("/health", get(health_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(Extension(app_state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
