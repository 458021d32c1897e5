//! HTTP and WebSocket route handlers.

pub mod health;
pub mod logs;
pub mod metrics;
pub mod remove;
pub mod run;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined router.
///
/// Routes:
/// - GET    /health       - Health check
/// - POST   /run          - Submit a playbook run
/// - GET    /ws/log/{id}  - WebSocket stream of the run's output
/// - DELETE /remove/{id}  - Kill and forget a run
/// - GET    /metrics      - Prometheus metrics
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health::router())
        .merge(run::router())
        .merge(logs::router())
        .merge(remove::router())
        .merge(metrics::router())
        .with_state(state)
}
