// crates/jobs/src/types.rs
//! Types shared across the job lifecycle.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Mint a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an identifier from its string form. Returns `None` for anything
    /// that is not a UUID, which callers treat the same as an unknown job.
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Which of the two phases of a job a process belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// `git pull` of the automation content.
    Sync,
    /// The `ansible-playbook` run itself.
    Playbook,
}

impl Step {
    pub fn as_str(self) -> &'static str {
        match self {
            Step::Sync => "sync",
            Step::Playbook => "playbook",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Option flags accepted on submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RunOption {
    /// Verbose output (`-v`).
    Debug,
    /// Simulate without applying changes (`--check`).
    DryRun,
    /// Show planned differences (`--diff`).
    Check,
}

impl RunOption {
    /// Map a client-supplied option string. Unknown strings yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "debug" => Some(RunOption::Debug),
            "dry-run" => Some(RunOption::DryRun),
            "check" => Some(RunOption::Check),
            _ => None,
        }
    }

    /// The `ansible-playbook` flag this option enables.
    pub fn flag(self) -> &'static str {
        match self {
            RunOption::Debug => "-v",
            RunOption::DryRun => "--check",
            RunOption::Check => "--diff",
        }
    }

    /// Parse a list of option names, dropping unknown ones and duplicates.
    /// The result is sorted, so flags are emitted in a stable order.
    pub fn parse_all<S: AsRef<str>>(names: &[S]) -> Vec<RunOption> {
        let mut options: Vec<RunOption> = names
            .iter()
            .filter_map(|name| {
                let parsed = RunOption::from_name(name.as_ref());
                if parsed.is_none() {
                    tracing::debug!(option = name.as_ref(), "Ignoring unrecognized run option");
                }
                parsed
            })
            .collect();
        options.sort();
        options.dedup();
        options
    }
}

/// Exit code reported for a step that could not be spawned at all.
pub const LAUNCH_FAILED_EXIT_CODE: i32 = 127;

/// Exit code reported when orchestration itself broke down.
pub const INTERNAL_ERROR_EXIT_CODE: i32 = -1;

/// Exit code reported for a job cancelled between steps; matches a
/// process killed with SIGKILL.
pub const CANCELLED_EXIT_CODE: i32 = -9;

/// Terminal state of a job. Once recorded on a job it never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobOutcome {
    /// The playbook run terminated with this exit code. Signals map to
    /// `-signal` so a killed run is distinguishable from a normal exit.
    Exited { code: i32 },
    /// The sync step exited nonzero; the playbook was never launched.
    SyncFailed { code: i32 },
    /// A step could not be spawned.
    LaunchFailed { step: Step, message: String },
    /// Removed before the playbook was launched.
    Cancelled,
    /// Orchestration failed for some other reason.
    InternalError { message: String },
}

impl JobOutcome {
    /// Integer status reported to subscribers.
    pub fn exit_code(&self) -> i32 {
        match self {
            JobOutcome::Exited { code } | JobOutcome::SyncFailed { code } => *code,
            JobOutcome::LaunchFailed { .. } => LAUNCH_FAILED_EXIT_CODE,
            JobOutcome::Cancelled => CANCELLED_EXIT_CODE,
            JobOutcome::InternalError { .. } => INTERNAL_ERROR_EXIT_CODE,
        }
    }

    /// True only for a playbook run that exited 0.
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Exited { code: 0 })
    }

    /// Short label used for metrics and log fields.
    pub fn label(&self) -> &'static str {
        match self {
            JobOutcome::Exited { code: 0 } => "success",
            JobOutcome::Exited { .. } => "failed",
            JobOutcome::SyncFailed { .. } => "sync_failed",
            JobOutcome::LaunchFailed { .. } => "launch_failed",
            JobOutcome::Cancelled => "cancelled",
            JobOutcome::InternalError { .. } => "internal_error",
        }
    }

    /// The final message sent to a log subscriber.
    pub fn status_message(&self) -> String {
        match self {
            JobOutcome::Exited { code } => format!("Process exited with code {code}"),
            JobOutcome::SyncFailed { code } => format!("Sync step failed with code {code}"),
            JobOutcome::LaunchFailed { step, message } => {
                format!("Failed to launch {step}: {message}")
            }
            JobOutcome::Cancelled => "Job cancelled".to_string(),
            JobOutcome::InternalError { message } => format!("Internal error: {message}"),
        }
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.status_message())
    }
}
