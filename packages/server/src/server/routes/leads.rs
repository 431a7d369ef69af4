//! Lead ingestion webhook.
//!
//! The external lead-database provider delivers search results here once a
//! search job finishes. Leads are bulk-inserted with status pending under
//! the scrape job, and the job's generation status flips idle -> queued,
//! which hands it to the icebreaker worker.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::domains::jobs::ScrapeJob;
use crate::domains::leads::{Lead, NewLead};
use crate::server::app::AxumAppState;

#[derive(Debug, Deserialize)]
pub struct ImportEnvelope {
    pub record: ImportRecord,
}

#[derive(Debug, Deserialize)]
pub struct ImportRecord {
    /// Scrape job the results belong to
    pub id: Uuid,
    #[serde(default)]
    pub leads: Vec<NewLead>,
}

/// Ingest a batch of leads for a scrape job and queue generation.
pub async fn import_leads_handler(
    Extension(state): Extension<AxumAppState>,
    Json(envelope): Json<ImportEnvelope>,
) -> Response {
    let record = envelope.record;

    // The tenant comes from the job row, never from the webhook body.
    let job = match ScrapeJob::find_by_id(record.id, &state.deps.db_pool).await {
        Ok(Some(job)) => job,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "unknown scrape job" })),
            )
                .into_response();
        }
        Err(e) => {
            error!(job_id = %record.id, error = %e, "failed to load scrape job");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "import failed" })),
            )
                .into_response();
        }
    };

    let inserted = if record.leads.is_empty() {
        0
    } else {
        match Lead::insert_batch(job.id, job.organization_id, &record.leads, &state.deps.db_pool).await
        {
            Ok(inserted) => inserted,
            Err(e) => {
                error!(job_id = %job.id, error = %e, "failed to insert leads");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "import failed" })),
                )
                    .into_response();
            }
        }
    };

    let queued = match ScrapeJob::queue_generation(job.id, &state.deps.db_pool).await {
        Ok(queued) => queued,
        Err(e) => {
            error!(job_id = %job.id, error = %e, "failed to queue generation");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "import failed" })),
            )
                .into_response();
        }
    };

    info!(job_id = %job.id, inserted, queued, "lead import accepted");

    (
        StatusCode::OK,
        Json(json!({ "inserted": inserted, "queued": queued })),
    )
        .into_response()
}
