// crates/jobs/src/record.rs
//! Mutable state of a single job.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::types::{JobId, JobOutcome, Step};

/// The process a job is currently running, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessSlot {
    pub step: Step,
    pub pid: Option<u32>,
    pub started_at: DateTime<Utc>,
}

/// Lines appended after `cursor`, read atomically with the outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogChunk {
    pub lines: Vec<String>,
    pub outcome: Option<JobOutcome>,
}

#[derive(Debug, Default)]
struct Inner {
    process: Option<ProcessSlot>,
    log: Vec<String>,
    outcome: Option<JobOutcome>,
    finished_at: Option<DateTime<Utc>>,
}

/// State of one job, shared as `Arc<JobRecord>` between the orchestrator,
/// log subscribers and the removal path.
///
/// Every mutable field sits behind one mutex, so a reader never sees an
/// outcome without also seeing every line appended before it. The lock is
/// never held across an await.
#[derive(Debug)]
pub struct JobRecord {
    id: JobId,
    created_at: DateTime<Utc>,
    inventory_path: Option<PathBuf>,
    inner: Mutex<Inner>,
    changed: Notify,
    cancel: CancellationToken,
}

impl JobRecord {
    pub fn new(id: JobId, inventory_path: Option<PathBuf>) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            inventory_path,
            inner: Mutex::new(Inner::default()),
            changed: Notify::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Inventory artifact generated for this job, removed on cleanup.
    pub fn inventory_path(&self) -> Option<&Path> {
        self.inventory_path.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append one output line. Returns `false` (and drops the line) once the
    /// job is terminal.
    pub fn append_line(&self, line: impl Into<String>) -> bool {
        {
            let mut inner = self.lock();
            if inner.outcome.is_some() {
                return false;
            }
            inner.log.push(line.into());
        }
        self.changed.notify_waiters();
        true
    }

    /// Record the terminal outcome. Only the first call has any effect.
    pub fn finish(&self, outcome: JobOutcome) -> bool {
        {
            let mut inner = self.lock();
            if inner.outcome.is_some() {
                return false;
            }
            inner.outcome = Some(outcome);
            inner.process = None;
            inner.finished_at = Some(Utc::now());
        }
        self.changed.notify_waiters();
        true
    }

    pub fn outcome(&self) -> Option<JobOutcome> {
        self.lock().outcome.clone()
    }

    pub fn is_terminal(&self) -> bool {
        self.lock().outcome.is_some()
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.lock().finished_at
    }

    pub fn log_len(&self) -> usize {
        self.lock().log.len()
    }

    /// Lines from `cursor` onward plus the outcome, taken under one lock.
    pub fn read_from(&self, cursor: usize) -> LogChunk {
        let inner = self.lock();
        let start = cursor.min(inner.log.len());
        LogChunk {
            lines: inner.log[start..].to_vec(),
            outcome: inner.outcome.clone(),
        }
    }

    /// Note the process now running for `step`.
    pub fn attach_process(&self, step: Step, pid: Option<u32>) {
        let mut inner = self.lock();
        if inner.outcome.is_none() {
            inner.process = Some(ProcessSlot {
                step,
                pid,
                started_at: Utc::now(),
            });
        }
    }

    pub fn detach_process(&self) {
        self.lock().process = None;
    }

    pub fn process(&self) -> Option<ProcessSlot> {
        self.lock().process.clone()
    }

    /// Ask whoever owns the running process to kill it. Returns `true` if a
    /// process was active at the time of the call.
    pub fn cancel(&self) -> bool {
        let had_process = self.lock().process.is_some();
        self.cancel.cancel();
        had_process
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait until an outcome is recorded. Returns `false` if `limit` passes first.
    pub async fn wait_terminal(&self, limit: Duration) -> bool {
        let wait = async {
            loop {
                let notified = self.changed.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if self.is_terminal() {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(limit, wait).await.is_ok()
    }

    /// Change notifications, fired after every append and on finish.
    pub(crate) fn changed(&self) -> &Notify {
        &self.changed
    }
}
