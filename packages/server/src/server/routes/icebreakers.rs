//! Generation trigger endpoint.
//!
//! `POST /hooks/icebreakers/generate` carries a JSON envelope whose
//! `record` names the scrape job whose generation status just became
//! queued. Delivery is at-least-once; the worker's entry point is safe
//! under duplicates, so the handler just runs one invocation and reports
//! what that invocation itself did.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::error;
use uuid::Uuid;

use crate::server::app::AxumAppState;

/// Run one worker invocation for the job in the trigger envelope.
///
/// Responds `{ completed, failed, remaining }` for this invocation's own
/// work, not cumulative job totals.
pub async fn generate_icebreakers_handler(
    Extension(state): Extension<AxumAppState>,
    Json(payload): Json<Value>,
) -> Response {
    let Some((job_id, context_org)) = parse_trigger(&payload) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid trigger payload" })),
        )
            .into_response();
    };

    match state.worker.run_invocation(job_id, context_org).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => {
            error!(job_id = %job_id, error = %e, "icebreaker invocation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "generation failed" })),
            )
                .into_response()
        }
    }
}

/// Parse the trigger envelope: `{ record: { id, icebreaker_config_org_id? } }`.
///
/// Returns None on any other shape. A present-but-invalid override id
/// rejects the whole payload rather than being silently dropped.
fn parse_trigger(payload: &Value) -> Option<(Uuid, Option<Uuid>)> {
    let record = payload.get("record")?;
    let job_id: Uuid = record.get("id")?.as_str()?.parse().ok()?;

    let context_org = match record.get("icebreaker_config_org_id") {
        None | Some(Value::Null) => None,
        Some(value) => Some(value.as_str()?.parse().ok()?),
    };

    Some((job_id, context_org))
}
