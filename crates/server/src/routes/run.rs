// crates/server/src/routes/run.rs
//! Playbook submission endpoint.

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use playbook_runner_jobs::SubmitRequest;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::state::AppState;

/// One inventory target.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(test, derive(Serialize))]
pub struct HostItem {
    #[serde(rename = "serverIP")]
    pub server_ip: String,
}

/// Body of `POST /run`.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(test, derive(Serialize))]
pub struct RunRequest {
    /// Playbook path relative to the automation directory.
    pub playbook: String,
    pub hosts: Vec<HostItem>,
    /// `debug`, `dry-run`, `check`; anything else is ignored.
    #[serde(default)]
    pub options: Vec<String>,
}

impl From<RunRequest> for SubmitRequest {
    fn from(req: RunRequest) -> Self {
        SubmitRequest {
            playbook: req.playbook,
            hosts: req.hosts.into_iter().map(|h| h.server_ip).collect(),
            options: req.options,
        }
    }
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub struct RunResponse {
    /// Execution id to subscribe to or remove.
    pub ident: String,
}

/// POST /run - validate the playbook, write the inventory and start the job.
pub async fn run_playbook(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RunRequest>,
) -> ApiResult<Json<RunResponse>> {
    let id = state.jobs.submit(request.into()).await?;
    Ok(Json(RunResponse {
        ident: id.to_string(),
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/run", post(run_playbook))
}
