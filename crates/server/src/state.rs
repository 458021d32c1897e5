// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;
use std::time::Instant;

use playbook_runner_jobs::{AutomationSettings, JobRunner};

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// Owns the job registry and spawns one orchestration task per job.
    pub jobs: Arc<JobRunner>,
}

impl AppState {
    /// State backed by real `git` / `ansible-playbook` processes.
    pub fn new(settings: AutomationSettings) -> Arc<Self> {
        Self::with_runner(Arc::new(JobRunner::new(settings)))
    }

    /// State around an existing runner, e.g. one with a scripted launcher.
    pub fn with_runner(jobs: Arc<JobRunner>) -> Arc<Self> {
        Arc::new(Self {
            start_time: Instant::now(),
            jobs,
        })
    }

    /// Get server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
