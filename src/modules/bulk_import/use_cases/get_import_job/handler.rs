use crate::modules::bulk_import::core::job::ImportJob;
use crate::shared::infrastructure::import_jobs::{ImportJobStore, JobStoreError};
use std::sync::Arc;

pub struct GetImportJobHandler<TJobs>
where
    TJobs: ImportJobStore + 'static,
{
    jobs: Arc<TJobs>,
}

impl<TJobs> GetImportJobHandler<TJobs>
where
    TJobs: ImportJobStore + 'static,
{
    pub fn new(jobs: Arc<TJobs>) -> Self {
        Self { jobs }
    }

    pub async fn handle(&self, job_id: &str) -> Result<Option<ImportJob>, JobStoreError> {
        self.jobs.get(job_id).await
    }
}
