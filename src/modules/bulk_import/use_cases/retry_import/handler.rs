// Retry a failed import.
//
// The failed job stays in the history untouched. A new pending job reads the
// same staged rows and is announced with `job.created` like a fresh submission.

use crate::modules::bulk_import::adapters::outbound::event_emitter::dispatch_intents;
use crate::modules::bulk_import::core::events::ImportJobCreated;
use crate::modules::bulk_import::core::intents::ImportIntent;
use crate::modules::bulk_import::core::job::{ImportJob, TransitionError};
use crate::shared::infrastructure::event_publisher::{EmitStatus, EventEmitter};
use crate::shared::infrastructure::import_jobs::{ImportJobStore, JobStoreError};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RetryError {
    #[error("import job {0} not found")]
    NotFound(String),

    #[error("import job cannot be retried: {0}")]
    NotRetryable(#[from] TransitionError),

    #[error(transparent)]
    Jobs(#[from] JobStoreError),

    #[error("import job {0} was recorded but could not be dispatched")]
    NotDispatched(String),
}

pub struct RetryImportHandler<TJobs>
where
    TJobs: ImportJobStore + 'static,
{
    jobs: Arc<TJobs>,
    emitter: EventEmitter,
}

impl<TJobs> RetryImportHandler<TJobs>
where
    TJobs: ImportJobStore + 'static,
{
    pub fn new(jobs: Arc<TJobs>, emitter: EventEmitter) -> Self {
        Self { jobs, emitter }
    }

    #[tracing::instrument(name = "import.retry", skip(self))]
    pub async fn handle(
        &self,
        job_id: &str,
        requested_by: &str,
        correlation_id: Option<String>,
    ) -> Result<ImportJob, RetryError> {
        let failed = self
            .jobs
            .get(job_id)
            .await?
            .ok_or_else(|| RetryError::NotFound(job_id.to_string()))?;
        let retry = failed.retry(Uuid::now_v7().to_string(), correlation_id, Utc::now())?;
        let job = self.jobs.create_if_absent(retry).await?;
        info!(retry_job_id = %job.job_id, "import retry submitted");

        let created = ImportIntent::PublishJobCreated {
            payload: ImportJobCreated {
                job_id: job.job_id.clone(),
                source_ref: job.source_ref.clone(),
                total_rows: job.total_rows,
                mode: job.mode,
            },
        };
        let statuses =
            dispatch_intents(&self.emitter, job.correlation_id.as_deref(), vec![created]).await;
        if statuses.contains(&EmitStatus::Failed) {
            warn!(retry_job_id = %job.job_id, "retry left pending, job.created not published");
            return Err(RetryError::NotDispatched(job.job_id));
        }
        Ok(job)
    }
}

#[cfg(test)]
mod retry_import_handler_tests {
    use super::*;
    use crate::modules::bulk_import::adapters::outbound::event_emitter::JOB_CREATED_TOPIC;
    use crate::modules::bulk_import::core::job::{ImportMode, ImportStatus};
    use crate::shared::infrastructure::event_publisher::in_memory::InMemoryEventPublisher;
    use crate::shared::infrastructure::import_jobs::in_memory::InMemoryImportJobStore;
    use rstest::{fixture, rstest};
    use std::time::Duration;

    type BeforeEachReturn = (Arc<InMemoryImportJobStore>, Arc<InMemoryEventPublisher>);

    #[fixture]
    fn before_each() -> BeforeEachReturn {
        (
            Arc::new(InMemoryImportJobStore::new()),
            Arc::new(InMemoryEventPublisher::new()),
        )
    }

    fn handler(
        jobs: Arc<InMemoryImportJobStore>,
        publisher: Arc<InMemoryEventPublisher>,
    ) -> RetryImportHandler<InMemoryImportJobStore> {
        RetryImportHandler::new(jobs, EventEmitter::new(publisher, Duration::from_secs(1)))
    }

    async fn seed(jobs: &InMemoryImportJobStore, fail: bool) {
        let mut job = ImportJob::pending(
            "job-1",
            "staged/job-1",
            8,
            ImportMode::AllOrNothing,
            Some("corr-1".into()),
            Utc::now(),
        );
        job.start("instance-a:1", Utc::now()).unwrap();
        if fail {
            job.fail("validation failed", Utc::now()).unwrap();
        } else {
            job.complete(Utc::now()).unwrap();
        }
        jobs.create_if_absent(job).await.unwrap();
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_submit_a_new_job_over_the_same_rows(before_each: BeforeEachReturn) {
        let (jobs, publisher) = before_each;
        seed(&jobs, true).await;

        let job = handler(jobs.clone(), publisher.clone())
            .handle("job-1", "admin-1", Some("corr-2".into()))
            .await
            .unwrap();

        assert_ne!(job.job_id, "job-1");
        assert_eq!(job.status, ImportStatus::Pending);
        assert_eq!(job.retry_of.as_deref(), Some("job-1"));
        assert_eq!(job.source_ref, "staged/job-1");
        assert_eq!(job.total_rows, 8);
        let original = jobs.get("job-1").await.unwrap().unwrap();
        assert_eq!(original.status, ImportStatus::Failed);
        let created = publisher.published_on(JOB_CREATED_TOPIC).await;
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].data["jobId"], job.job_id.as_str());
        assert_eq!(created[0].data["mode"], "all-or-nothing");
        assert_eq!(created[0].correlation_id.as_deref(), Some("corr-2"));
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_refuse_a_job_that_did_not_fail(before_each: BeforeEachReturn) {
        let (jobs, publisher) = before_each;
        seed(&jobs, false).await;

        let error = handler(jobs, publisher.clone())
            .handle("job-1", "admin-1", None)
            .await
            .unwrap_err();

        assert!(matches!(error, RetryError::NotRetryable(_)));
        assert!(publisher.published().await.is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_report_an_unknown_job(before_each: BeforeEachReturn) {
        let (jobs, publisher) = before_each;

        let error = handler(jobs, publisher).handle("nope", "admin-1", None).await.unwrap_err();

        assert!(matches!(error, RetryError::NotFound(id) if id == "nope"));
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_keep_the_retry_pending_when_it_cannot_be_announced(
        before_each: BeforeEachReturn,
    ) {
        let (jobs, _) = before_each;
        seed(&jobs, true).await;
        let mut publisher = InMemoryEventPublisher::new();
        publisher.toggle_offline();

        let error = handler(jobs.clone(), Arc::new(publisher))
            .handle("job-1", "admin-1", None)
            .await
            .unwrap_err();

        let RetryError::NotDispatched(retry_id) = error else {
            panic!("expected NotDispatched, got {error:?}");
        };
        let retry = jobs.get(&retry_id).await.unwrap().unwrap();
        assert_eq!(retry.status, ImportStatus::Pending);
    }
}
