// crates/jobs/src/registry.rs
//! Concurrency-safe map from job id to job record.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::record::JobRecord;
use crate::types::JobId;

/// The single source of truth for which jobs exist.
///
/// Records are inserted once at submission and erased once, either by the
/// log stream after delivering the outcome or by an explicit removal.
/// Erasing only drops the map's reference: anyone still holding the
/// `Arc<JobRecord>` can finish with it, but nothing puts it back.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, Arc<JobRecord>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record. Returns `false` (leaving the existing entry alone)
    /// if the id is already present.
    pub fn register(&self, record: Arc<JobRecord>) -> bool {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        let id = record.id();
        if jobs.contains_key(&id) {
            tracing::error!(job_id = %id, "Refusing to register duplicate job id");
            return false;
        }
        jobs.insert(id, record);
        true
    }

    pub fn get(&self, id: &JobId) -> Option<Arc<JobRecord>> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn contains(&self, id: &JobId) -> bool {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    /// Erase a record. `None` if it was already gone.
    pub fn remove(&self, id: &JobId) -> Option<Arc<JobRecord>> {
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    pub fn len(&self) -> usize {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> Vec<JobId> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect()
    }

    /// Number of registered jobs that have not reached a terminal state.
    pub fn running_count(&self) -> usize {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|record| !record.is_terminal())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JobOutcome;

    fn record() -> Arc<JobRecord> {
        Arc::new(JobRecord::new(JobId::new(), None))
    }

    #[test]
    fn test_register_get_remove() {
        let registry = JobRegistry::new();
        let rec = record();
        let id = rec.id();

        assert!(registry.register(rec.clone()));
        assert!(registry.contains(&id));
        assert_eq!(registry.len(), 1);
        assert!(Arc::ptr_eq(&registry.get(&id).unwrap(), &rec));

        let removed = registry.remove(&id).unwrap();
        assert!(Arc::ptr_eq(&removed, &rec));
        assert!(registry.get(&id).is_none());
        assert!(registry.remove(&id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_duplicate_register_is_rejected() {
        let registry = JobRegistry::new();
        let rec = record();
        assert!(registry.register(rec.clone()));
        assert!(!registry.register(Arc::new(JobRecord::new(rec.id(), None))));
        assert!(Arc::ptr_eq(&registry.get(&rec.id()).unwrap(), &rec));
    }

    #[test]
    fn test_erased_record_stays_usable_by_holders() {
        let registry = JobRegistry::new();
        let rec = record();
        let id = rec.id();
        registry.register(rec.clone());

        let held = registry.get(&id).unwrap();
        registry.remove(&id);

        // The holder can keep writing; the registry does not see it again.
        assert!(held.append_line("still here"));
        assert!(held.finish(JobOutcome::Exited { code: 0 }));
        assert!(!registry.contains(&id));
    }

    #[test]
    fn test_running_count_excludes_terminal_jobs() {
        let registry = JobRegistry::new();
        let running = record();
        let done = record();
        done.finish(JobOutcome::Exited { code: 0 });
        registry.register(running);
        registry.register(done);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.running_count(), 1);
        assert_eq!(registry.ids().len(), 2);
    }

    #[test]
    fn test_concurrent_registers_and_removes() {
        let registry = Arc::new(JobRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let rec = record();
                        let id = rec.id();
                        assert!(registry.register(rec));
                        assert!(registry.remove(&id).is_some());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(registry.is_empty());
    }
}
