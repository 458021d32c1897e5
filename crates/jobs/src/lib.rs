// crates/jobs/src/lib.rs
//! Job lifecycle for playbook runs: sync the automation repository, run
//! `ansible-playbook` against a generated inventory, and stream its output
//! to subscribers until the outcome is known.

pub mod error;
pub mod inventory;
pub mod orchestrator;
pub mod process;
pub mod record;
pub mod registry;
pub mod runner;
pub mod settings;
pub mod stream;
pub mod types;

pub use error::{JobError, LaunchError};
pub use orchestrator::{JobPlan, Orchestrator};
pub use process::{CommandSpec, ProcessLauncher, RunningProcess, SystemLauncher};
pub use record::{JobRecord, LogChunk, ProcessSlot};
pub use registry::JobRegistry;
pub use runner::{JobRunner, SubmitRequest};
pub use settings::{AutomationSettings, GitRemote};
pub use stream::{LogSubscription, StreamEvent, DEFAULT_POLL_INTERVAL};
pub use types::{JobId, JobOutcome, RunOption, Step};
