//! WebSocket log stream for a single execution.
//!
//! - `WS /ws/log/{id}` -- one text message per output line, then the status
//!   message, then a normal close.
//!
//! Messages are plain text, not JSON. Once the status message went out the
//! job's inventory is deleted and the job is forgotten; a client that goes
//! away earlier leaves the job registered so it can reconnect.

use std::sync::Arc;

use axum::{
    extract::ws::{close_code, CloseFrame, Message, WebSocket},
    extract::{Path, State, WebSocketUpgrade},
    response::Response,
    routing::get,
    Router,
};
use playbook_runner_jobs::{JobId, LogSubscription, StreamEvent};

use crate::metrics::SubscriberGauge;
use crate::state::AppState;

/// Sent instead of any log output when the id is unknown.
pub const NOT_FOUND_MESSAGE: &str = "Execution ID not found";

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/ws/log/{id}", get(ws_log_handler))
}

async fn ws_log_handler(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    let subscription = JobId::parse(&raw_id).and_then(|id| state.jobs.subscribe(&id));

    ws.on_upgrade(move |mut socket| async move {
        match subscription {
            Some(subscription) => {
                let _gauge = SubscriberGauge::open();
                stream_log(socket, state, subscription).await;
            }
            None => {
                tracing::debug!(job_id = %raw_id, "Log subscription for unknown execution");
                let _ = socket.send(Message::Text(NOT_FOUND_MESSAGE.into())).await;
                let _ = socket.send(Message::Close(None)).await;
            }
        }
    })
}

async fn stream_log(mut socket: WebSocket, state: Arc<AppState>, mut subscription: LogSubscription) {
    let job_id = subscription.job_id();
    tracing::debug!(job_id = %job_id, "Log subscriber connected");

    loop {
        tokio::select! {
            event = subscription.next_event() => match event {
                StreamEvent::Lines(lines) => {
                    for line in lines {
                        if socket.send(Message::Text(line.into())).await.is_err() {
                            tracing::debug!(job_id = %job_id, "Client disconnected during log stream");
                            return;
                        }
                    }
                }
                StreamEvent::Finished(outcome) => {
                    if socket
                        .send(Message::Text(outcome.status_message().into()))
                        .await
                        .is_err()
                    {
                        tracing::debug!(job_id = %job_id, "Client disconnected before status message");
                        return;
                    }
                    let _ = socket
                        .send(Message::Close(Some(CloseFrame {
                            code: close_code::NORMAL,
                            reason: "".into(),
                        })))
                        .await;
                    state.jobs.finish_stream(&job_id).await;
                    tracing::info!(
                        job_id = %job_id,
                        lines = subscription.cursor(),
                        exit_code = outcome.exit_code(),
                        "Log stream delivered"
                    );
                    return;
                }
            },

            client_msg = socket.recv() => match client_msg {
                Some(Ok(Message::Close(_))) | None => {
                    tracing::debug!(job_id = %job_id, "Log subscriber disconnected");
                    return;
                }
                Some(Err(e)) => {
                    tracing::debug!(job_id = %job_id, error = %e, "WebSocket receive error");
                    return;
                }
                // Pings are answered by the protocol layer; text is ignored.
                Some(Ok(_)) => {}
            },
        }
    }
}
