// crates/jobs/src/inventory.rs
//! Generated per-job inventory files.

use std::path::{Path, PathBuf};

use crate::error::JobError;
use crate::types::JobId;

/// Section header every generated inventory starts with.
pub const INVENTORY_SECTION: &str = "[targets]";

/// Where the inventory for `id` lives inside `dir`.
pub fn inventory_path(dir: &Path, id: JobId) -> PathBuf {
    dir.join(format!("{id}_inventory.ini"))
}

/// Inventory body: the section header followed by one host per line.
pub fn render_inventory<S: AsRef<str>>(hosts: &[S]) -> String {
    let mut body = String::from(INVENTORY_SECTION);
    body.push('\n');
    body.push_str(
        &hosts
            .iter()
            .map(|h| h.as_ref())
            .collect::<Vec<_>>()
            .join("\n"),
    );
    body
}

/// Trim host entries and reject anything that would break out of its line.
pub fn normalize_hosts<S: AsRef<str>>(hosts: &[S]) -> Result<Vec<String>, JobError> {
    hosts
        .iter()
        .map(|h| h.as_ref().trim())
        .filter(|h| !h.is_empty())
        .map(|h| {
            if h.contains(['\n', '\r']) {
                Err(JobError::InvalidHost(h.to_string()))
            } else {
                Ok(h.to_string())
            }
        })
        .collect()
}

/// Write the inventory for `id` and return its path.
pub async fn write_inventory<S: AsRef<str>>(
    dir: &Path,
    id: JobId,
    hosts: &[S],
) -> Result<PathBuf, JobError> {
    let path = inventory_path(dir, id);
    tokio::fs::write(&path, render_inventory(hosts))
        .await
        .map_err(|source| JobError::Inventory {
            path: path.clone(),
            source,
        })?;
    tracing::debug!(job_id = %id, path = %path.display(), hosts = hosts.len(), "Wrote inventory");
    Ok(path)
}

/// Best-effort delete. Returns `true` if a file was removed; failures are
/// logged and swallowed.
pub async fn remove_inventory(path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Removed inventory");
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to delete inventory file");
            false
        }
    }
}
