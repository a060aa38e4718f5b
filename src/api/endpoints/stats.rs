//! Service statistics from the audit trail.

use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, StatsResponse};
use crate::config::{APP_VERSION, MODEL_VERSION};

/// Requests listed under `recent_requests`.
pub const RECENT_REQUESTS: usize = 10;

/// `GET /api/stats`
pub async fn get(State(ctx): State<ApiContext>) -> Result<Json<StatsResponse>, ApiError> {
    let (counts, recent) = {
        let audit = ctx
            .audit
            .lock()
            .map_err(|_| ApiError::Internal("audit log lock".into()))?;
        (audit.status_counts()?, audit.recent(RECENT_REQUESTS)?)
    };

    Ok(Json(StatsResponse {
        status: "operational",
        version: APP_VERSION,
        model_version: MODEL_VERSION,
        llm_configured: ctx.pipeline.has_llm(),
        retrieval_configured: ctx.pipeline.has_retriever(),
        requests_total: counts.total(),
        requests_by_status: counts,
        recent_requests: recent.into_iter().map(Into::into).collect(),
    }))
}
