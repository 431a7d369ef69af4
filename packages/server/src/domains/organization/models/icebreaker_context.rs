use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Tenant icebreaker configuration - SQL persistence layer
///
/// Read-only input to generation; owned by the tenant-admin UI and never
/// mutated by the worker. Absence is not an error: generation falls back to
/// built-in defaults.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct IcebreakerContext {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub description: Option<String>,
    pub output_format: Option<String>,
    pub good_examples: Vec<String>,
    pub bad_examples: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IcebreakerContext {
    /// Find the context for an organization, if it has one
    pub async fn find_by_organization(
        organization_id: Uuid,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM icebreaker_contexts WHERE organization_id = $1")
            .bind(organization_id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }
}
