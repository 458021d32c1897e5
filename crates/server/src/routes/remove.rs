// crates/server/src/routes/remove.rs
//! Job removal endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::delete,
    Json, Router,
};
use playbook_runner_jobs::JobId;
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct RemoveResponse {
    pub message: String,
}

/// DELETE /remove/{id} - kill the job's process if any and forget the job.
pub async fn remove_execution(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> ApiResult<Json<RemoveResponse>> {
    let id = JobId::parse(&raw_id).ok_or_else(|| ApiError::NotFound(raw_id.clone()))?;
    state.jobs.remove(&id).await?;
    Ok(Json(RemoveResponse {
        message: format!("Execution {id} logs and process removed successfully."),
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/remove/{id}", delete(remove_execution))
}
