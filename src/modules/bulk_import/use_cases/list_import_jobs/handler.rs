use crate::shared::infrastructure::import_jobs::{
    ImportJobPage, ImportJobQuery, ImportJobStore, JobStoreError,
};
use std::sync::Arc;

pub struct ListImportJobsHandler<TJobs>
where
    TJobs: ImportJobStore + 'static,
{
    jobs: Arc<TJobs>,
}

impl<TJobs> ListImportJobsHandler<TJobs>
where
    TJobs: ImportJobStore + 'static,
{
    pub fn new(jobs: Arc<TJobs>) -> Self {
        Self { jobs }
    }

    pub async fn handle(&self, query: ImportJobQuery) -> Result<ImportJobPage, JobStoreError> {
        self.jobs.list(&query.normalized()).await
    }
}
