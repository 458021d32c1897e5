// crates/jobs/src/runner.rs
//! Central job runner: submission, subscription and removal of playbook jobs.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinHandle;

use crate::error::JobError;
use crate::inventory::{normalize_hosts, remove_inventory, write_inventory};
use crate::orchestrator::{JobPlan, Orchestrator};
use crate::process::{ProcessLauncher, SystemLauncher};
use crate::record::JobRecord;
use crate::registry::JobRegistry;
use crate::settings::AutomationSettings;
use crate::stream::LogSubscription;
use crate::types::{JobId, JobOutcome, RunOption};

/// How long `remove` waits for a cancelled job's process to be killed and reaped.
const REMOVE_KILL_TIMEOUT: Duration = Duration::from_secs(5);

/// A validated-on-submit request to run one playbook.
#[derive(Debug, Clone, Default)]
pub struct SubmitRequest {
    /// Playbook path, relative to the automation directory.
    pub playbook: String,
    pub hosts: Vec<String>,
    /// Option names as sent by the client; unknown names are ignored.
    pub options: Vec<String>,
}

/// Central job runner that owns the registry and spawns one task per job.
///
/// Thread-safe; share it as `Arc<JobRunner>`.
pub struct JobRunner {
    registry: Arc<JobRegistry>,
    orchestrator: Arc<Orchestrator>,
    settings: Arc<AutomationSettings>,
}

impl JobRunner {
    /// Runner that launches real `git` / `ansible-playbook` processes.
    pub fn new(settings: AutomationSettings) -> Self {
        Self::with_launcher(settings, Arc::new(SystemLauncher))
    }

    pub fn with_launcher(settings: AutomationSettings, launcher: Arc<dyn ProcessLauncher>) -> Self {
        let settings = Arc::new(settings);
        Self {
            registry: Arc::new(JobRegistry::new()),
            orchestrator: Arc::new(Orchestrator::new(launcher, settings.clone())),
            settings,
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn settings(&self) -> &AutomationSettings {
        &self.settings
    }

    /// Jobs registered and not yet terminal.
    pub fn running_count(&self) -> usize {
        self.registry.running_count()
    }

    /// Validate the request, write the inventory, register the job and start
    /// it in the background. The id is subscribable as soon as this returns.
    pub async fn submit(&self, request: SubmitRequest) -> Result<JobId, JobError> {
        let playbook = self.settings.resolve_playbook(&request.playbook);
        if !is_file(&playbook).await {
            return Err(JobError::PlaybookNotFound(playbook));
        }

        let hosts = normalize_hosts(&request.hosts)?;
        let options = RunOption::parse_all(&request.options);

        let id = JobId::new();
        let inventory = write_inventory(&self.settings.inventory_dir, id, &hosts).await?;

        if let Err(e) = self.execute(id, playbook, inventory.clone(), options) {
            remove_inventory(&inventory).await;
            return Err(e);
        }
        counter!("jobs_submitted_total").increment(1);
        tracing::info!(job_id = %id, hosts = hosts.len(), "Job submitted");
        Ok(id)
    }

    /// Register a job under `id` and spawn its orchestration.
    ///
    /// The returned handle resolves to the recorded outcome; dropping it
    /// does not stop the job.
    pub fn execute(
        &self,
        id: JobId,
        playbook: PathBuf,
        inventory: PathBuf,
        options: Vec<RunOption>,
    ) -> Result<JoinHandle<JobOutcome>, JobError> {
        let record = Arc::new(JobRecord::new(id, Some(inventory.clone())));
        if !self.registry.register(record.clone()) {
            return Err(JobError::Duplicate(id));
        }

        let plan = JobPlan {
            playbook,
            inventory,
            options,
        };
        let orchestrator = self.orchestrator.clone();
        Ok(tokio::spawn(async move { orchestrator.execute(record, plan).await }))
    }

    /// Start reading a job's log from the beginning. `None` if unknown.
    pub fn subscribe(&self, id: &JobId) -> Option<LogSubscription> {
        self.registry
            .get(id)
            .map(|record| LogSubscription::new(record, self.settings.poll_interval))
    }

    /// Erase the job, stop its process and delete its inventory.
    ///
    /// Returns once the orchestrator has killed and reaped the process and
    /// recorded the outcome, or after a bounded wait.
    pub async fn remove(&self, id: &JobId) -> Result<(), JobError> {
        let record = self.registry.remove(id).ok_or(JobError::NotFound(*id))?;
        let had_process = record.cancel();
        if !record.wait_terminal(REMOVE_KILL_TIMEOUT).await {
            tracing::warn!(job_id = %id, "Cancelled job did not stop in time");
        }
        if let Some(path) = record.inventory_path() {
            remove_inventory(path).await;
        }
        counter!("jobs_removed_total").increment(1);
        tracing::info!(job_id = %id, killed_process = had_process, "Job removed");
        Ok(())
    }

    /// Cleanup after a subscriber has seen the job's outcome: delete the
    /// inventory and erase the record. Returns `false` if already erased.
    pub async fn finish_stream(&self, id: &JobId) -> bool {
        let Some(record) = self.registry.remove(id) else {
            return false;
        };
        if let Some(path) = record.inventory_path() {
            remove_inventory(path).await;
        }
        tracing::debug!(job_id = %id, "Job erased after log delivery");
        true
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}
