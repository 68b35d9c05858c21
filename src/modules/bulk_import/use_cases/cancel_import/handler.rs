// Request cancellation of an import job.
//
// Only flags the job. The coordinator owning it stops at the next batch boundary
// and is the one that moves it to `cancelled`.

use crate::modules::bulk_import::core::job::ImportJob;
use crate::shared::infrastructure::import_jobs::{ImportJobStore, JobStoreError};
use std::sync::Arc;
use tracing::info;

pub struct CancelImportHandler<TJobs>
where
    TJobs: ImportJobStore + 'static,
{
    jobs: Arc<TJobs>,
}

impl<TJobs> CancelImportHandler<TJobs>
where
    TJobs: ImportJobStore + 'static,
{
    pub fn new(jobs: Arc<TJobs>) -> Self {
        Self { jobs }
    }

    #[tracing::instrument(name = "import.cancel", skip(self))]
    pub async fn handle(
        &self,
        job_id: &str,
        requested_by: &str,
    ) -> Result<ImportJob, JobStoreError> {
        let job = self.jobs.request_cancel(job_id).await?;
        info!(status = %job.status, "import cancellation requested");
        Ok(job)
    }
}
