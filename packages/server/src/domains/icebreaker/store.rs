//! Persistence seam for the generation worker.
//!
//! The worker talks to storage only through `IcebreakerStore`, so the whole
//! control loop runs against an in-memory fake in tests. The Postgres
//! implementation delegates to the domain models.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domains::jobs::{GenerationProgress, ScrapeJob};
use crate::domains::leads::Lead;
use crate::domains::organization::IcebreakerContext;

#[async_trait]
pub trait IcebreakerStore: Send + Sync {
    /// Load a job without changing it.
    async fn find_job(&self, job_id: Uuid) -> Result<Option<ScrapeJob>>;

    /// Guarded queued/running -> running transition; None when the status
    /// already progressed past this set.
    async fn begin_job(&self, job_id: Uuid) -> Result<Option<ScrapeJob>>;

    /// Tenant generation configuration, if the organization has one.
    async fn context_for_org(&self, organization_id: Uuid)
        -> Result<Option<IcebreakerContext>>;

    /// Up to `limit` pending leads for the job, oldest first.
    async fn fetch_pending(&self, job_id: Uuid, limit: i64) -> Result<Vec<Lead>>;

    /// Conditional pending -> generating flip; returns the ids actually
    /// claimed (rows a concurrent invocation reached first are left out).
    async fn claim_pending(&self, lead_ids: &[Uuid]) -> Result<Vec<Uuid>>;

    /// Terminal success for one lead.
    async fn complete_lead(&self, lead_id: Uuid, icebreaker: &str) -> Result<()>;

    /// Terminal failure for one lead.
    async fn fail_lead(&self, lead_id: Uuid) -> Result<()>;

    /// Recomputed completed/failed/total counts for the job.
    async fn progress_counts(&self, job_id: Uuid) -> Result<GenerationProgress>;

    /// Overwrite the job's progress snapshot.
    async fn write_progress(&self, job_id: Uuid, progress: &GenerationProgress) -> Result<()>;

    /// Leads still in pending or generating.
    async fn count_unfinished(&self, job_id: Uuid) -> Result<i64>;

    /// Terminal job transition (idempotent rewrite on re-delivery).
    async fn finish_job(&self, job_id: Uuid) -> Result<()>;

    /// Flip the job back to queued for a fresh invocation.
    async fn requeue_job(&self, job_id: Uuid) -> Result<()>;
}

/// PostgreSQL-backed store used in production.
#[derive(Clone)]
pub struct PostgresIcebreakerStore {
    pool: PgPool,
}

impl PostgresIcebreakerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IcebreakerStore for PostgresIcebreakerStore {
    async fn find_job(&self, job_id: Uuid) -> Result<Option<ScrapeJob>> {
        ScrapeJob::find_by_id(job_id, &self.pool).await
    }

    async fn begin_job(&self, job_id: Uuid) -> Result<Option<ScrapeJob>> {
        ScrapeJob::begin_generation(job_id, &self.pool).await
    }

    async fn context_for_org(
        &self,
        organization_id: Uuid,
    ) -> Result<Option<IcebreakerContext>> {
        IcebreakerContext::find_by_organization(organization_id, &self.pool).await
    }

    async fn fetch_pending(&self, job_id: Uuid, limit: i64) -> Result<Vec<Lead>> {
        Lead::find_pending_page(job_id, limit, &self.pool).await
    }

    async fn claim_pending(&self, lead_ids: &[Uuid]) -> Result<Vec<Uuid>> {
        Lead::claim_pending(lead_ids, &self.pool).await
    }

    async fn complete_lead(&self, lead_id: Uuid, icebreaker: &str) -> Result<()> {
        Lead::mark_completed(lead_id, icebreaker, &self.pool).await
    }

    async fn fail_lead(&self, lead_id: Uuid) -> Result<()> {
        Lead::mark_failed(lead_id, &self.pool).await
    }

    async fn progress_counts(&self, job_id: Uuid) -> Result<GenerationProgress> {
        Lead::status_counts(job_id, &self.pool).await
    }

    async fn write_progress(&self, job_id: Uuid, progress: &GenerationProgress) -> Result<()> {
        ScrapeJob::write_progress(job_id, progress, &self.pool).await
    }

    async fn count_unfinished(&self, job_id: Uuid) -> Result<i64> {
        Lead::count_unfinished(job_id, &self.pool).await
    }

    async fn finish_job(&self, job_id: Uuid) -> Result<()> {
        ScrapeJob::finish_generation(job_id, &self.pool).await
    }

    async fn requeue_job(&self, job_id: Uuid) -> Result<()> {
        ScrapeJob::requeue_generation(job_id, &self.pool).await
    }
}
