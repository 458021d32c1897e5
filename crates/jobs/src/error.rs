// crates/jobs/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

use crate::types::JobId;

/// Errors returned synchronously from job submission and removal.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(JobId),

    #[error("Job already registered: {0}")]
    Duplicate(JobId),

    #[error("Playbook not found: {}", .0.display())]
    PlaybookNotFound(PathBuf),

    #[error("Invalid host entry: {0:?}")]
    InvalidHost(String),

    #[error("Failed to write inventory {}: {source}", path.display())]
    Inventory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A step's process could not be spawned.
///
/// Kept apart from `JobError`: it never reaches a caller, it becomes the
/// job's terminal outcome.
#[derive(Debug, Error)]
#[error("failed to spawn {program}: {source}")]
pub struct LaunchError {
    pub program: String,
    #[source]
    pub source: std::io::Error,
}
