//! The self-resuming icebreaker generation worker.
//!
//! One invocation of `run_invocation` is one bounded unit of work: claim
//! pending leads page by page, generate an opening line per lead with
//! bounded fan-out, and stop cooperatively at the wall-clock ceiling. The
//! wrap-up step either completes the job or flips it back to queued, which
//! causes the trigger mechanism to deliver a fresh invocation — that is how
//! jobs with tens of thousands of leads finish unattended across many short
//! executions.
//!
//! ```text
//! run_invocation(job_id)
//!     │
//!     ├─► begin_job (guarded queued/running -> running)
//!     ├─► resolve tenant context (once per invocation)
//!     ├─► loop: fetch pending page
//!     │       ├─► per sub-batch: claim, then join_all generation calls
//!     │       └─► overwrite progress snapshot
//!     └─► wrap-up: 0 unfinished -> completed, else -> queued (requeue)
//! ```
//!
//! Invocation is at-least-once: a duplicate delivery racing this one only
//! ever claims leads the first did not, because the claim is a conditional
//! status flip.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use futures::future;
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::store::IcebreakerStore;
use super::{extract, prompt};
use crate::domains::leads::Lead;
use crate::domains::organization::IcebreakerContext;
use crate::kernel::BaseAI;

/// Configuration for the generation worker.
#[derive(Debug, Clone)]
pub struct IcebreakerWorkerConfig {
    /// Wall-clock ceiling per invocation; checked between sub-batches and
    /// pages, never preemptively
    pub time_budget: Duration,
    /// Pending leads fetched per page
    pub page_size: i64,
    /// Sub-batch size; bounds peak concurrent completion calls
    pub batch_size: usize,
}

impl Default for IcebreakerWorkerConfig {
    fn default() -> Self {
        Self {
            time_budget: Duration::from_secs(110),
            page_size: 100,
            batch_size: 10,
        }
    }
}

/// What one invocation itself did (not cumulative job totals).
#[derive(Debug, Clone, Copy, Serialize)]
pub struct InvocationSummary {
    pub completed: i64,
    pub failed: i64,
    pub remaining: i64,
}

enum LeadOutcome {
    Completed,
    Failed,
}

/// Generates icebreakers for one scrape job at a time, within a time budget.
pub struct IcebreakerWorker {
    store: Arc<dyn IcebreakerStore>,
    ai: Arc<dyn BaseAI>,
    config: IcebreakerWorkerConfig,
}

impl IcebreakerWorker {
    /// Create a new worker with default configuration.
    pub fn new(store: Arc<dyn IcebreakerStore>, ai: Arc<dyn BaseAI>) -> Self {
        Self {
            store,
            ai,
            config: IcebreakerWorkerConfig::default(),
        }
    }

    /// Create with custom configuration.
    pub fn with_config(
        store: Arc<dyn IcebreakerStore>,
        ai: Arc<dyn BaseAI>,
        config: IcebreakerWorkerConfig,
    ) -> Self {
        Self { store, ai, config }
    }

    /// Run one invocation for a job.
    ///
    /// Safe under duplicate delivery; see module docs. `context_org`
    /// overrides which organization's icebreaker configuration is used
    /// (defaults to the job's own organization).
    pub async fn run_invocation(
        &self,
        job_id: Uuid,
        context_org: Option<Uuid>,
    ) -> Result<InvocationSummary> {
        let started = Instant::now();

        let job = match self.store.begin_job(job_id).await? {
            Some(job) => job,
            // Status already progressed past queued/running; still run the
            // loop and wrap-up so a re-delivery of a finished job is a
            // harmless idempotent pass.
            None => self
                .store
                .find_job(job_id)
                .await?
                .ok_or_else(|| anyhow!("unknown scrape job {job_id}"))?,
        };

        let organization_id = context_org.unwrap_or(job.organization_id);
        let context = match self.store.context_for_org(organization_id).await {
            Ok(context) => context,
            Err(e) => {
                // Absent or unreadable tenant context is not an error.
                warn!(job_id = %job_id, error = %e, "icebreaker context lookup failed, using defaults");
                None
            }
        };

        let mut completed: i64 = 0;
        let mut failed: i64 = 0;
        let mut did_work = false;
        let mut out_of_time = false;

        loop {
            if did_work && started.elapsed() >= self.config.time_budget {
                out_of_time = true;
                break;
            }

            let page = self
                .store
                .fetch_pending(job_id, self.config.page_size)
                .await?;
            if page.is_empty() {
                break;
            }

            for chunk in page.chunks(self.config.batch_size) {
                // The first sub-batch always runs so every invocation makes
                // forward progress; a ceiling shorter than one sub-batch
                // would otherwise requeue forever.
                if did_work && started.elapsed() >= self.config.time_budget {
                    out_of_time = true;
                    break;
                }

                let ids: Vec<Uuid> = chunk.iter().map(|lead| lead.id).collect();
                let claimed: HashSet<Uuid> = self
                    .store
                    .claim_pending(&ids)
                    .await?
                    .into_iter()
                    .collect();
                if claimed.is_empty() {
                    // A concurrent invocation claimed these rows first.
                    debug!(job_id = %job_id, "sub-batch already claimed elsewhere");
                    continue;
                }

                let outcomes = future::join_all(
                    chunk
                        .iter()
                        .filter(|lead| claimed.contains(&lead.id))
                        .map(|lead| self.generate_one(lead, context.as_ref())),
                )
                .await;

                for outcome in outcomes {
                    match outcome {
                        LeadOutcome::Completed => completed += 1,
                        LeadOutcome::Failed => failed += 1,
                    }
                }
                did_work = true;
            }

            // Chunk boundary: overwrite the snapshot with recomputed counts
            // so externally inserted leads are reflected in the total.
            let progress = self.store.progress_counts(job_id).await?;
            self.store.write_progress(job_id, &progress).await?;

            if out_of_time {
                break;
            }
        }

        // Wrap-up. Failed leads are a terminal sub-state, not a reason to
        // keep the job open: only pending/generating rows hold it.
        let progress = self.store.progress_counts(job_id).await?;
        self.store.write_progress(job_id, &progress).await?;

        let remaining = self.store.count_unfinished(job_id).await?;
        if remaining == 0 {
            self.store.finish_job(job_id).await?;
            info!(
                job_id = %job_id,
                completed,
                failed,
                "icebreaker generation completed"
            );
        } else {
            self.store.requeue_job(job_id).await?;
            info!(
                job_id = %job_id,
                completed,
                failed,
                remaining,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "time budget reached, job requeued"
            );
        }

        Ok(InvocationSummary {
            completed,
            failed,
            remaining,
        })
    }

    /// Generate and persist one lead's icebreaker. Never escalates: any
    /// failure lands the lead in status failed and the loop moves on.
    async fn generate_one(
        &self,
        lead: &Lead,
        context: Option<&IcebreakerContext>,
    ) -> LeadOutcome {
        let request = prompt::build_request(lead, context);

        let text = match self.ai.complete_chat(&request.system, &request.user).await {
            Ok(text) => text,
            Err(e) => {
                warn!(lead_id = %lead.id, error = %e, "completion call failed");
                return self.fail_lead(lead.id).await;
            }
        };

        match extract::salvage(&text) {
            Some(icebreaker) => {
                if let Err(e) = self.store.complete_lead(lead.id, &icebreaker).await {
                    error!(lead_id = %lead.id, error = %e, "failed to store icebreaker");
                    return LeadOutcome::Failed;
                }
                LeadOutcome::Completed
            }
            None => {
                debug!(lead_id = %lead.id, "empty completion response");
                self.fail_lead(lead.id).await
            }
        }
    }

    async fn fail_lead(&self, lead_id: Uuid) -> LeadOutcome {
        if let Err(e) = self.store.fail_lead(lead_id).await {
            error!(lead_id = %lead_id, error = %e, "failed to mark lead as failed");
        }
        LeadOutcome::Failed
    }
}
