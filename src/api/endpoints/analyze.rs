//! Clinical note analysis endpoint.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::{AnalysisResponse, ClinicalNoteRequest};
use crate::pipeline::new_request_id;

/// `POST /api/analyze`: run the full pipeline on one note.
///
/// The pipeline is synchronous (blocking HTTP to the LLM and vector store),
/// so it runs on the blocking pool. Every request gets an audit row, which
/// ends as `completed` or `failed`.
pub async fn analyze(
    State(ctx): State<ApiContext>,
    payload: Result<Json<ClinicalNoteRequest>, JsonRejection>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let request_id = new_request_id();

    // Step 1: Open the audit record
    {
        let audit = ctx
            .audit
            .lock()
            .map_err(|_| ApiError::Internal("audit log lock".into()))?;
        audit.record_started(&request_id, &request)?;
    }

    // Step 2: Run the pipeline off the async workers
    let pipeline = ctx.pipeline.clone();
    let id = request_id.clone();
    let outcome = tokio::task::spawn_blocking(move || pipeline.analyze_with_id(&id, &request)).await;

    // Step 3: Close the audit record
    let audit = ctx
        .audit
        .lock()
        .map_err(|_| ApiError::Internal("audit log lock".into()))?;
    match outcome {
        Ok(Ok(response)) => {
            if let Err(e) = audit.record_completed(&request_id, &response) {
                tracing::error!(request_id, error = %e, "Failed to record completed analysis");
            }
            Ok(Json(response))
        }
        Ok(Err(err)) => {
            tracing::warn!(request_id, error = %err, "Analysis failed");
            if let Err(e) = audit.record_failed(&request_id, &err.to_string()) {
                tracing::error!(request_id, error = %e, "Failed to record failed analysis");
            }
            Err(err.into())
        }
        Err(join) => {
            if let Err(e) = audit.record_failed(&request_id, "analysis task aborted") {
                tracing::error!(request_id, error = %e, "Failed to record failed analysis");
            }
            Err(ApiError::Internal(format!("analysis task: {join}")))
        }
    }
}
