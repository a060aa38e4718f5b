//! Audit-trail lookup for a previous analysis.

use axum::extract::{Path, State};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, StatusResponse};

/// `GET /api/status/:request_id`
pub async fn get(
    State(ctx): State<ApiContext>,
    Path(request_id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let record = {
        let audit = ctx
            .audit
            .lock()
            .map_err(|_| ApiError::Internal("audit log lock".into()))?;
        audit.get(&request_id)?
    };
    Ok(Json(record.into()))
}
