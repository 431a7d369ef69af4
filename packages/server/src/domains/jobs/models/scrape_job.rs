use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Icebreaker generation status of a scrape job.
///
/// Drives the self-chaining control loop: `queued` jobs get picked up by
/// the worker, `running` jobs are in flight, and a requeue back to `queued`
/// re-arms delivery when an invocation runs out of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStatus {
    Idle,
    Queued,
    Running,
    Completed,
}

impl GenerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(Self::Idle),
            "queued" => Some(Self::Queued),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// Snapshot of generation progress, overwritten (not accumulated) on each
/// chunk boundary. Dashboards read this field only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationProgress {
    pub completed: i64,
    pub failed: i64,
    pub total: i64,
}

/// Scrape job model - SQL persistence layer
///
/// A batch unit grouping leads fetched together, tracked through its own
/// generation-status state machine.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct ScrapeJob {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub icebreaker_generation_status: String,
    pub icebreaker_generation_progress: serde_json::Value,
    pub icebreaker_generation_started_at: Option<DateTime<Utc>>,
    pub icebreaker_generation_completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ScrapeJob {
    pub fn generation_status(&self) -> Option<GenerationStatus> {
        GenerationStatus::parse(&self.icebreaker_generation_status)
    }

    /// Find job by ID
    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM scrape_jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Find jobs whose generation is queued, oldest first (for the dispatcher)
    pub async fn find_queued(limit: i64, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM scrape_jobs
             WHERE icebreaker_generation_status = $1
             ORDER BY created_at
             LIMIT $2",
        )
        .bind(GenerationStatus::Queued.as_str())
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Guarded queued/running -> running transition at invocation entry.
    ///
    /// Returns None when the status has already progressed past this set
    /// (idempotent re-entry under duplicate delivery). The started_at stamp
    /// is preserved across re-invocations of the same job.
    pub async fn begin_generation(id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "UPDATE scrape_jobs
             SET icebreaker_generation_status = $2,
                 icebreaker_generation_started_at =
                     COALESCE(icebreaker_generation_started_at, now())
             WHERE id = $1
               AND icebreaker_generation_status IN ($2, $3)
             RETURNING *",
        )
        .bind(id)
        .bind(GenerationStatus::Running.as_str())
        .bind(GenerationStatus::Queued.as_str())
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// Terminal transition once no pending/generating leads remain.
    ///
    /// A second invocation finding the job already completed is a no-op
    /// rewrite; the completion stamp is set once and never moves.
    pub async fn finish_generation(id: Uuid, pool: &PgPool) -> Result<()> {
        sqlx::query(
            "UPDATE scrape_jobs
             SET icebreaker_generation_status = $2,
                 icebreaker_generation_completed_at =
                     COALESCE(icebreaker_generation_completed_at, now())
             WHERE id = $1",
        )
        .bind(id)
        .bind(GenerationStatus::Completed.as_str())
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Flip the job back to queued so the trigger mechanism delivers a
    /// fresh invocation (the self-chaining step after a ceiling exit).
    pub async fn requeue_generation(id: Uuid, pool: &PgPool) -> Result<()> {
        sqlx::query(
            "UPDATE scrape_jobs
             SET icebreaker_generation_status = $2
             WHERE id = $1",
        )
        .bind(id)
        .bind(GenerationStatus::Queued.as_str())
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Queue generation for a job still in idle (used by lead ingestion).
    ///
    /// Returns false when the job was not in idle (already queued or beyond).
    pub async fn queue_generation(id: Uuid, pool: &PgPool) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE scrape_jobs
             SET icebreaker_generation_status = $2
             WHERE id = $1
               AND icebreaker_generation_status = $3",
        )
        .bind(id)
        .bind(GenerationStatus::Queued.as_str())
        .bind(GenerationStatus::Idle.as_str())
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Overwrite the progress snapshot
    pub async fn write_progress(
        id: Uuid,
        progress: &GenerationProgress,
        pool: &PgPool,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE scrape_jobs
             SET icebreaker_generation_progress = $2
             WHERE id = $1",
        )
        .bind(id)
        .bind(serde_json::to_value(progress)?)
        .execute(pool)
        .await?;

        Ok(())
    }
}
