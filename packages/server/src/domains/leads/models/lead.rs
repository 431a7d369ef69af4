use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domains::jobs::GenerationProgress;

/// Icebreaker status of a single lead.
///
/// pending -> generating -> {completed | failed}; never backward. The
/// pending -> generating flip is the claim that reserves a lead for one
/// invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadStatus {
    Pending,
    Generating,
    Completed,
    Failed,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Generating => "generating",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "generating" => Some(Self::Generating),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Lead model - SQL persistence layer
///
/// A prospective contact belonging to one tenant, sourced from an external
/// search provider. Name/company/title and raw_data are immutable after
/// creation; only the icebreaker fields are written by the worker.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Lead {
    pub id: Uuid,
    pub scrape_job_id: Uuid,
    pub organization_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub title: String,
    pub raw_data: serde_json::Value,
    pub icebreaker_status: String,
    pub icebreaker: Option<String>,
    pub icebreaker_generated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Incoming lead from the ingestion webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct NewLead {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub raw_data: serde_json::Value,
}

impl Lead {
    pub fn status(&self) -> Option<LeadStatus> {
        LeadStatus::parse(&self.icebreaker_status)
    }

    /// Fetch up to `limit` pending leads for a job, oldest first
    pub async fn find_pending_page(job_id: Uuid, limit: i64, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM leads
             WHERE scrape_job_id = $1
               AND icebreaker_status = $3
             ORDER BY created_at
             LIMIT $2",
        )
        .bind(job_id)
        .bind(limit)
        .bind(LeadStatus::Pending.as_str())
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Claim leads for processing: conditional pending -> generating flip.
    ///
    /// Returns the ids actually claimed. Rows a concurrent invocation
    /// claimed first are no longer pending and are left out, so no lead is
    /// ever processed twice.
    pub async fn claim_pending(ids: &[Uuid], pool: &PgPool) -> Result<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            "UPDATE leads
             SET icebreaker_status = $2
             WHERE id = ANY($1)
               AND icebreaker_status = $3
             RETURNING id",
        )
        .bind(ids)
        .bind(LeadStatus::Generating.as_str())
        .bind(LeadStatus::Pending.as_str())
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Terminal success: store the icebreaker and stamp generation time
    pub async fn mark_completed(id: Uuid, icebreaker: &str, pool: &PgPool) -> Result<()> {
        sqlx::query(
            "UPDATE leads
             SET icebreaker_status = $3,
                 icebreaker = $2,
                 icebreaker_generated_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .bind(icebreaker)
        .bind(LeadStatus::Completed.as_str())
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Terminal failure: not retried within the same job run
    pub async fn mark_failed(id: Uuid, pool: &PgPool) -> Result<()> {
        sqlx::query(
            "UPDATE leads
             SET icebreaker_status = $2
             WHERE id = $1",
        )
        .bind(id)
        .bind(LeadStatus::Failed.as_str())
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Count leads still in pending or generating for a job
    pub async fn count_unfinished(job_id: Uuid, pool: &PgPool) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM leads
             WHERE scrape_job_id = $1
               AND icebreaker_status IN ($2, $3)",
        )
        .bind(job_id)
        .bind(LeadStatus::Pending.as_str())
        .bind(LeadStatus::Generating.as_str())
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Recompute the progress snapshot from lead statuses.
    ///
    /// The total is recomputed, not cached, so leads inserted externally
    /// after the job started are reflected.
    pub async fn status_counts(job_id: Uuid, pool: &PgPool) -> Result<GenerationProgress> {
        let (completed, failed, total) = sqlx::query_as::<_, (i64, i64, i64)>(
            "SELECT
                 COUNT(*) FILTER (WHERE icebreaker_status = $2),
                 COUNT(*) FILTER (WHERE icebreaker_status = $3),
                 COUNT(*)
             FROM leads
             WHERE scrape_job_id = $1",
        )
        .bind(job_id)
        .bind(LeadStatus::Completed.as_str())
        .bind(LeadStatus::Failed.as_str())
        .fetch_one(pool)
        .await?;

        Ok(GenerationProgress {
            completed,
            failed,
            total,
        })
    }

    /// Bulk-insert leads for a job with status pending (ingestion webhook)
    pub async fn insert_batch(
        job_id: Uuid,
        organization_id: Uuid,
        leads: &[NewLead],
        pool: &PgPool,
    ) -> Result<u64> {
        let mut tx = pool.begin().await?;

        for lead in leads {
            sqlx::query(
                "INSERT INTO leads (
                    scrape_job_id, organization_id,
                    first_name, last_name, company, title, raw_data
                 )
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(job_id)
            .bind(organization_id)
            .bind(&lead.first_name)
            .bind(&lead.last_name)
            .bind(&lead.company)
            .bind(&lead.title)
            .bind(&lead.raw_data)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(leads.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            LeadStatus::Pending,
            LeadStatus::Generating,
            LeadStatus::Completed,
            LeadStatus::Failed,
        ] {
            assert_eq!(LeadStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(LeadStatus::parse("archived"), None);
    }

    #[test]
    fn test_new_lead_defaults() {
        let lead: NewLead = serde_json::from_str(r#"{"first_name": "Sam"}"#).unwrap();
        assert_eq!(lead.first_name, "Sam");
        assert_eq!(lead.company, "");
        assert!(lead.raw_data.is_null());
    }
}
