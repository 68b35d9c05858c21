use crate::modules::bulk_import::core::job::ImportJob;
use crate::shared::infrastructure::import_jobs::{
    ImportJobPage, ImportJobQuery, ImportJobStore, JobStoreError,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryImportJobStore {
    jobs: RwLock<HashMap<String, ImportJob>>,
    is_offline: bool,
    failing_saves: AtomicUsize,
}

impl InMemoryImportJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle_offline(&mut self) {
        self.is_offline = !self.is_offline;
    }

    /// Make the next `count` saves fail with a backend error.
    pub fn fail_next_saves(&self, count: usize) {
        self.failing_saves.store(count, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), JobStoreError> {
        if self.is_offline {
            return Err(JobStoreError::Backend("Job store offline".into()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ImportJobStore for InMemoryImportJobStore {
    async fn create_if_absent(&self, job: ImportJob) -> Result<ImportJob, JobStoreError> {
        self.ensure_online()?;
        let mut guard = self.jobs.write().await;
        Ok(guard.entry(job.job_id.clone()).or_insert(job).clone())
    }

    async fn get(&self, job_id: &str) -> Result<Option<ImportJob>, JobStoreError> {
        self.ensure_online()?;
        Ok(self.jobs.read().await.get(job_id).cloned())
    }

    async fn save(&self, job: &ImportJob) -> Result<(), JobStoreError> {
        self.ensure_online()?;
        let failing = self.failing_saves.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_saves.store(failing - 1, Ordering::SeqCst);
            return Err(JobStoreError::Backend("Job store write timeout".into()));
        }
        let mut guard = self.jobs.write().await;
        let mut next = job.clone();
        if let Some(stored) = guard.get(&job.job_id) {
            if stored.status.is_terminal() {
                return Err(JobStoreError::Terminal {
                    job_id: job.job_id.clone(),
                    status: stored.status,
                });
            }
            next.cancel_requested |= stored.cancel_requested;
        }
        guard.insert(next.job_id.clone(), next);
        Ok(())
    }

    async fn request_cancel(&self, job_id: &str) -> Result<ImportJob, JobStoreError> {
        self.ensure_online()?;
        let mut guard = self.jobs.write().await;
        let job = guard
            .get_mut(job_id)
            .ok_or_else(|| JobStoreError::NotFound(job_id.to_string()))?;
        if job.status.is_terminal() {
            return Err(JobStoreError::Terminal {
                job_id: job_id.to_string(),
                status: job.status,
            });
        }
        job.cancel_requested = true;
        Ok(job.clone())
    }

    async fn list(&self, query: &ImportJobQuery) -> Result<ImportJobPage, JobStoreError> {
        self.ensure_online()?;
        let guard = self.jobs.read().await;
        let mut matching: Vec<&ImportJob> = guard
            .values()
            .filter(|job| query.status.is_none_or(|status| job.status == status))
            .collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.job_id.cmp(&a.job_id))
        });

        let total = matching.len();
        let offset = query.offset().min(total);
        let jobs: Vec<ImportJob> = matching
            .into_iter()
            .skip(offset)
            .take(query.page_size as usize)
            .cloned()
            .collect();
        Ok(ImportJobPage {
            has_more: offset + jobs.len() < total,
            jobs,
            total: total as u64,
            page: query.page,
            page_size: query.page_size,
        })
    }

    async fn delete(&self, job_id: &str) -> Result<ImportJob, JobStoreError> {
        self.ensure_online()?;
        let mut guard = self.jobs.write().await;
        let job = guard
            .get(job_id)
            .ok_or_else(|| JobStoreError::NotFound(job_id.to_string()))?;
        if !job.status.is_terminal() {
            return Err(JobStoreError::Active {
                job_id: job_id.to_string(),
                status: job.status,
            });
        }
        guard
            .remove(job_id)
            .ok_or_else(|| JobStoreError::NotFound(job_id.to_string()))
    }

    async fn count_by_source(&self, source_ref: &str) -> Result<u64, JobStoreError> {
        self.ensure_online()?;
        let guard = self.jobs.read().await;
        Ok(guard.values().filter(|j| j.source_ref == source_ref).count() as u64)
    }
}
