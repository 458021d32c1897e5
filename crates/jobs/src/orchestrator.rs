// crates/jobs/src/orchestrator.rs
//! Two-phase execution of a job: sync, then the playbook run.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tokio_util::sync::CancellationToken;

use crate::process::{CommandSpec, ProcessLauncher, RunningProcess};
use crate::record::JobRecord;
use crate::settings::AutomationSettings;
use crate::types::{JobOutcome, RunOption, Step};

/// Sync output lines kept for the diagnostic emitted when the sync fails.
const SYNC_TAIL_LINES: usize = 20;

/// Per-job inputs to the playbook run.
#[derive(Debug, Clone)]
pub struct JobPlan {
    pub playbook: PathBuf,
    pub inventory: PathBuf,
    pub options: Vec<RunOption>,
}

/// Drives one job from registration to its terminal outcome.
pub struct Orchestrator {
    launcher: Arc<dyn ProcessLauncher>,
    settings: Arc<AutomationSettings>,
}

/// Records an internal error if the orchestration future is dropped or
/// unwinds before an outcome was set. `finish` is first-write-wins, so on
/// the normal path this does nothing.
struct OutcomeGuard(Arc<JobRecord>);

impl Drop for OutcomeGuard {
    fn drop(&mut self) {
        let outcome = JobOutcome::InternalError {
            message: "orchestrator task ended without an outcome".into(),
        };
        if self.0.finish(outcome) {
            tracing::error!(job_id = %self.0.id(), "Job orchestration aborted; marked as internal error");
        }
    }
}

enum StepEvent {
    Cancelled,
    Line(Option<String>),
}

impl Orchestrator {
    pub fn new(launcher: Arc<dyn ProcessLauncher>, settings: Arc<AutomationSettings>) -> Self {
        Self { launcher, settings }
    }

    /// Run both steps for `job` and record the outcome on it.
    ///
    /// Never fails: every error becomes the job's outcome. The returned value
    /// is the outcome actually stored on the record.
    pub async fn execute(&self, job: Arc<JobRecord>, plan: JobPlan) -> JobOutcome {
        let _guard = OutcomeGuard(job.clone());
        let started = Instant::now();
        let job_id = job.id();

        tracing::info!(
            job_id = %job_id,
            playbook = %plan.playbook.display(),
            options = ?plan.options,
            "Job started"
        );

        let outcome = self.run(&job, &plan).await;
        if !job.finish(outcome.clone()) {
            tracing::debug!(job_id = %job_id, "Outcome was already recorded");
        }
        let recorded = job.outcome().unwrap_or(outcome);

        let elapsed = started.elapsed();
        counter!("jobs_finished_total", "outcome" => recorded.label()).increment(1);
        histogram!("job_duration_seconds", "outcome" => recorded.label()).record(elapsed.as_secs_f64());

        if recorded.is_success() {
            tracing::info!(
                job_id = %job_id,
                duration_secs = elapsed.as_secs_f64(),
                lines = job.log_len(),
                "Job finished"
            );
        } else {
            tracing::warn!(
                job_id = %job_id,
                outcome = recorded.label(),
                exit_code = recorded.exit_code(),
                duration_secs = elapsed.as_secs_f64(),
                "Job finished unsuccessfully"
            );
        }
        recorded
    }

    async fn run(&self, job: &JobRecord, plan: &JobPlan) -> JobOutcome {
        let sync = self.settings.sync_command();
        let (code, tail) = match self.run_step(job, Step::Sync, &sync).await {
            Ok(result) => result,
            Err(outcome) => return outcome,
        };
        if code != 0 {
            tracing::warn!(
                job_id = %job.id(),
                exit_code = code,
                output = %tail.join("\n"),
                "Sync step failed; playbook will not run"
            );
            return JobOutcome::SyncFailed { code };
        }

        if job.is_cancelled() {
            return JobOutcome::Cancelled;
        }

        let run = self
            .settings
            .playbook_command(&plan.playbook, &plan.inventory, &plan.options);
        match self.run_step(job, Step::Playbook, &run).await {
            Ok((code, _)) => JobOutcome::Exited { code },
            Err(outcome) => outcome,
        }
    }

    /// Launch one step and supervise it to exit. Returns the exit code and,
    /// for the sync step, the last few output lines.
    async fn run_step(
        &self,
        job: &JobRecord,
        step: Step,
        spec: &CommandSpec,
    ) -> Result<(i32, Vec<String>), JobOutcome> {
        tracing::info!(job_id = %job.id(), step = %step, command = %spec.redacted(), "Launching step");

        let mut process = self.launcher.launch(spec).map_err(|e| {
            tracing::error!(job_id = %job.id(), step = %step, error = %e, "Failed to launch step");
            JobOutcome::LaunchFailed {
                step,
                message: e.source.to_string(),
            }
        })?;

        job.attach_process(step, process.pid());
        let result = supervise(job, step, spec, &mut process, job.cancel_token()).await;
        job.detach_process();

        match result {
            Ok((code, tail)) => {
                tracing::debug!(job_id = %job.id(), step = %step, exit_code = code, "Step exited");
                Ok((code, tail))
            }
            Err(e) => {
                tracing::error!(job_id = %job.id(), step = %step, error = %e, "Lost track of step process");
                Err(JobOutcome::InternalError {
                    message: format!("{step} step: {e}"),
                })
            }
        }
    }
}

/// Drain the process's output into the job (playbook) or the operator log
/// (sync), then wait for exit. Cancellation kills the process at any point.
async fn supervise(
    job: &JobRecord,
    step: Step,
    spec: &CommandSpec,
    process: &mut RunningProcess,
    cancel: CancellationToken,
) -> std::io::Result<(i32, Vec<String>)> {
    let mut tail = VecDeque::with_capacity(SYNC_TAIL_LINES);

    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => StepEvent::Cancelled,
            line = process.next_line() => StepEvent::Line(line),
        };
        match event {
            StepEvent::Cancelled => {
                tracing::info!(job_id = %job.id(), step = %step, "Cancellation requested; killing process");
                let code = process.kill().await?;
                return Ok((code, tail.into()));
            }
            StepEvent::Line(Some(line)) => match step {
                Step::Playbook => {
                    job.append_line(line);
                }
                Step::Sync => {
                    let line = spec.redact(&line);
                    tracing::debug!(job_id = %job.id(), "sync: {line}");
                    if tail.len() == SYNC_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
            },
            StepEvent::Line(None) => break,
        }
    }

    let exited = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        code = process.wait() => Some(code),
    };
    let code = match exited {
        Some(code) => code?,
        None => process.kill().await?,
    };
    Ok((code, tail.into()))
}
