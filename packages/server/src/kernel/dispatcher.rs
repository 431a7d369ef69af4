//! Icebreaker dispatcher service.
//!
//! The requeue step of the worker flips a job back to `queued`; something
//! has to notice and deliver the next invocation. The webhook trigger does
//! this when an external scheduler is wired up, and this in-process
//! dispatcher does it otherwise: a background task that polls for queued
//! jobs and runs worker invocations through the exact same entry point, so
//! invocation semantics (idempotent re-entry, claim-before-process) are
//! identical no matter who delivers.
//!
//! # Example
//!
//! ```ignore
//! let dispatcher = IcebreakerDispatcher::new(pool, worker);
//! tokio::spawn(dispatcher.run());
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use sqlx::PgPool;
use tracing::{debug, error, info};

use crate::domains::icebreaker::IcebreakerWorker;
use crate::domains::jobs::ScrapeJob;

/// Configuration for the dispatcher.
#[derive(Debug, Clone)]
pub struct IcebreakerDispatcherConfig {
    /// Maximum queued jobs picked up per poll
    pub batch_size: i64,
    /// How long to wait when no jobs are queued
    pub poll_interval: Duration,
}

impl Default for IcebreakerDispatcherConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            poll_interval: Duration::from_secs(5),
        }
    }
}

/// Background service that delivers invocations for queued jobs.
pub struct IcebreakerDispatcher {
    pool: PgPool,
    worker: Arc<IcebreakerWorker>,
    config: IcebreakerDispatcherConfig,
}

impl IcebreakerDispatcher {
    /// Create a new dispatcher with default configuration.
    pub fn new(pool: PgPool, worker: Arc<IcebreakerWorker>) -> Self {
        Self {
            pool,
            worker,
            config: IcebreakerDispatcherConfig::default(),
        }
    }

    /// Create with custom configuration.
    pub fn with_config(
        pool: PgPool,
        worker: Arc<IcebreakerWorker>,
        config: IcebreakerDispatcherConfig,
    ) -> Self {
        Self {
            pool,
            worker,
            config,
        }
    }

    /// Run the dispatcher until the process exits.
    pub async fn run(self) -> Result<()> {
        info!(
            batch_size = self.config.batch_size,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "icebreaker dispatcher starting"
        );

        loop {
            let jobs = match ScrapeJob::find_queued(self.config.batch_size, &self.pool).await {
                Ok(jobs) => jobs,
                Err(e) => {
                    error!(error = %e, "failed to poll for queued jobs");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue;
                }
            };

            if jobs.is_empty() {
                tokio::time::sleep(self.config.poll_interval).await;
                continue;
            }

            debug!(count = jobs.len(), "picked up queued jobs");

            // Sequential on purpose: the worker already fans out per
            // sub-batch, and one job at a time keeps the completion-API
            // load bounded.
            for job in jobs {
                match self.worker.run_invocation(job.id, None).await {
                    Ok(summary) => {
                        debug!(
                            job_id = %job.id,
                            completed = summary.completed,
                            failed = summary.failed,
                            remaining = summary.remaining,
                            "invocation finished"
                        );
                    }
                    Err(e) => {
                        error!(job_id = %job.id, error = %e, "invocation failed");
                    }
                }
            }
        }
    }
}
