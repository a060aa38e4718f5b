//! Health check endpoint.

use axum::extract::State;
use axum::Json;

use crate::api::types::{ApiContext, HealthResponse};
use crate::config::{APP_VERSION, MODEL_VERSION};

/// `GET /api/health`: liveness plus which optional backends are wired.
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: APP_VERSION,
        model_version: MODEL_VERSION,
        llm_configured: ctx.pipeline.has_llm(),
        retrieval_configured: ctx.pipeline.has_retriever(),
    })
}
