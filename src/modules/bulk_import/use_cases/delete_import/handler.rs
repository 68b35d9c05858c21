// Delete a finished import job.
//
// Staged rows are discarded with the last job reading them, so a failed job's
// rows survive while one of its retries is still on record.

use crate::modules::bulk_import::core::job::ImportJob;
use crate::shared::infrastructure::import_jobs::{ImportJobStore, JobStoreError};
use crate::shared::infrastructure::import_source::ImportSource;
use std::sync::Arc;
use tracing::{info, warn};

pub struct DeleteImportHandler<TJobs, TSource>
where
    TJobs: ImportJobStore + 'static,
    TSource: ImportSource + 'static,
{
    jobs: Arc<TJobs>,
    source: Arc<TSource>,
}

impl<TJobs, TSource> DeleteImportHandler<TJobs, TSource>
where
    TJobs: ImportJobStore + 'static,
    TSource: ImportSource + 'static,
{
    pub fn new(jobs: Arc<TJobs>, source: Arc<TSource>) -> Self {
        Self { jobs, source }
    }

    #[tracing::instrument(name = "import.delete", skip(self))]
    pub async fn handle(
        &self,
        job_id: &str,
        requested_by: &str,
    ) -> Result<ImportJob, JobStoreError> {
        let job = self.jobs.delete(job_id).await?;
        info!(status = %job.status, "import job deleted");

        let readers = match self.jobs.count_by_source(&job.source_ref).await {
            Ok(readers) => readers,
            Err(error) => {
                warn!(source_ref = %job.source_ref, %error, "staged rows kept");
                return Ok(job);
            }
        };
        if readers == 0 {
            if let Err(error) = self.source.discard(&job.source_ref).await {
                warn!(source_ref = %job.source_ref, %error, "could not discard staged rows");
            }
        }
        Ok(job)
    }
}

#[cfg(test)]
mod delete_import_handler_tests {
    use super::*;
    use crate::modules::bulk_import::core::job::{ImportMode, ImportStatus};
    use crate::shared::infrastructure::import_jobs::in_memory::InMemoryImportJobStore;
    use crate::shared::infrastructure::import_source::in_memory::InMemoryImportSource;
    use crate::tests::fixtures::import_rows::numbered_rows;
    use chrono::Utc;
    use rstest::{fixture, rstest};

    type BeforeEachReturn = (Arc<InMemoryImportJobStore>, Arc<InMemoryImportSource>);

    #[fixture]
    fn before_each() -> BeforeEachReturn {
        (
            Arc::new(InMemoryImportJobStore::new()),
            Arc::new(InMemoryImportSource::new()),
        )
    }

    async fn failed_job(
        jobs: &InMemoryImportJobStore,
        source: &InMemoryImportSource,
    ) -> ImportJob {
        let source_ref = source.stage("job-1", numbered_rows(2)).await.unwrap();
        let mut job = ImportJob::pending(
            "job-1",
            source_ref,
            2,
            ImportMode::PartialImport,
            None,
            Utc::now(),
        );
        job.start("instance-a:1", Utc::now()).unwrap();
        job.fail("store unavailable", Utc::now()).unwrap();
        jobs.create_if_absent(job).await.unwrap()
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_delete_the_job_and_its_staged_rows(before_each: BeforeEachReturn) {
        let (jobs, source) = before_each;
        let job = failed_job(&jobs, &source).await;

        let deleted = DeleteImportHandler::new(jobs.clone(), source.clone())
            .handle("job-1", "admin-1")
            .await
            .unwrap();

        assert_eq!(deleted.status, ImportStatus::Failed);
        assert_eq!(jobs.get("job-1").await.unwrap(), None);
        assert!(source.read_batch(&job.source_ref, 0, 10).await.is_err());
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_keep_rows_still_read_by_a_retry(before_each: BeforeEachReturn) {
        let (jobs, source) = before_each;
        let job = failed_job(&jobs, &source).await;
        let retry = job.retry("job-2", None, Utc::now()).unwrap();
        jobs.create_if_absent(retry).await.unwrap();

        DeleteImportHandler::new(jobs.clone(), source.clone())
            .handle("job-1", "admin-1")
            .await
            .unwrap();

        let staged = source.read_batch(&job.source_ref, 0, 10).await.unwrap();
        assert_eq!(staged.len(), 2);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_refuse_a_job_still_running(before_each: BeforeEachReturn) {
        let (jobs, source) = before_each;
        let mut job = ImportJob::pending(
            "job-1",
            "staged/job-1",
            2,
            ImportMode::PartialImport,
            None,
            Utc::now(),
        );
        job.start("instance-a:1", Utc::now()).unwrap();
        jobs.create_if_absent(job).await.unwrap();

        let error = DeleteImportHandler::new(jobs.clone(), source)
            .handle("job-1", "admin-1")
            .await
            .unwrap_err();

        assert!(matches!(error, JobStoreError::Active { status: ImportStatus::Running, .. }));
        assert!(jobs.get("job-1").await.unwrap().is_some());
    }
}
