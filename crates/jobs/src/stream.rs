// crates/jobs/src/stream.rs
//! Incremental reader over a job's log.

use std::sync::Arc;
use std::time::Duration;

use crate::record::JobRecord;
use crate::types::{JobId, JobOutcome};

/// Default upper bound on how long a subscriber sleeps between checks when
/// no change notification arrives.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// What a subscriber gets back from [`LogSubscription::next_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Lines appended since the previous event, in append order.
    Lines(Vec<String>),
    /// The job is terminal and every line has already been delivered.
    Finished(JobOutcome),
}

/// A subscriber's cursor into one job's log.
///
/// Each line is handed out exactly once and in order. The outcome is only
/// reported after the cursor has caught up with the end of the log.
pub struct LogSubscription {
    record: Arc<JobRecord>,
    cursor: usize,
    poll_interval: Duration,
}

impl LogSubscription {
    pub fn new(record: Arc<JobRecord>, poll_interval: Duration) -> Self {
        Self {
            record,
            cursor: 0,
            poll_interval,
        }
    }

    pub fn job_id(&self) -> JobId {
        self.record.id()
    }

    pub fn record(&self) -> &Arc<JobRecord> {
        &self.record
    }

    /// Number of lines delivered so far.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Wait for new lines or for the job to finish.
    pub async fn next_event(&mut self) -> StreamEvent {
        loop {
            // Register interest before reading so an append racing with the
            // read below still wakes us.
            let notified = self.record.changed().notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let chunk = self.record.read_from(self.cursor);
            if !chunk.lines.is_empty() {
                self.cursor += chunk.lines.len();
                return StreamEvent::Lines(chunk.lines);
            }
            if let Some(outcome) = chunk.outcome {
                return StreamEvent::Finished(outcome);
            }

            let _ = tokio::time::timeout(self.poll_interval, notified).await;
        }
    }
}
