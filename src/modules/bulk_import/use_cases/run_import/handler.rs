// Bulk import coordinator.
//
// Purpose
// - Drive one import job from `pending` to a terminal state under a distributed lock.
//
// Responsibilities
// - Acquire the per-job lock with a per-attempt owner token; a lost race is not an error.
// - Page through the import source in fixed-size batches starting at `processed_rows`.
// - Check for cancellation, lock loss and shutdown between batches, never inside one.
// - Retry failing batches with exponential backoff before failing the job.
// - Emit progress on a wall-clock interval and exactly one terminal event.
// - Release the lock on every exit path; the lock TTL covers a crashed coordinator.
// - A detached run interrupted before finishing re-publishes `job.created`, so another
//   instance resumes the job from `processed_rows`.
//
// All-or-nothing imports validate every row before writing any, then commit batch by
// batch. A row that still fails during commit rolls back every product of the job.

use crate::modules::bulk_import::adapters::outbound::event_emitter::dispatch_intents;
use crate::modules::bulk_import::core::events::ImportJobCreated;
use crate::modules::bulk_import::core::intents::{ImportIntent, ImportPhase};
use crate::modules::bulk_import::core::job::{
    ImportJob, ImportMode, ImportStatus, RowError, TransitionError,
};
use crate::modules::bulk_import::core::row::{
    ImportRow, RowRejection, to_product, validate_row,
};
use crate::modules::bulk_import::use_cases::run_import::lease::LeaseKeeper;
use crate::shared::config::ServiceConfig;
use crate::shared::core::envelope::{EventMeta, HandlerOutcome};
use crate::shared::infrastructure::distributed_lock::{DistributedLock, LockError};
use crate::shared::infrastructure::event_publisher::EventEmitter;
use crate::shared::infrastructure::import_jobs::{ImportJobStore, JobStoreError};
use crate::shared::infrastructure::import_source::{ImportSource, ImportSourceError};
use crate::shared::infrastructure::product_store::{ProductStore, ProductStoreError};
use backon::{BackoffBuilder, ExponentialBuilder};
use chrono::Utc;
use std::collections::HashSet;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSettings {
    pub batch_size: usize,
    pub lock_ttl: Duration,
    pub progress_interval: Duration,
    pub max_batch_retries: usize,
    pub retry_min_delay: Duration,
}

impl ImportSettings {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            batch_size: config.import_batch_size.max(1),
            lock_ttl: config.import_lock_ttl(),
            progress_interval: config.import_progress_interval(),
            max_batch_retries: config.import_max_batch_retries,
            retry_min_delay: config.import_retry_min_delay(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Jobs(#[from] JobStoreError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl ImportError {
    pub fn handler_outcome(&self) -> HandlerOutcome {
        match self {
            ImportError::Jobs(JobStoreError::Backend(_)) | ImportError::Lock(_) => {
                HandlerOutcome::Retry
            }
            ImportError::Jobs(_) | ImportError::Transition(_) => HandlerOutcome::Drop,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbandonReason {
    LockLost,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Finished(ImportStatus),
    AlreadyTerminal(ImportStatus),
    LockNotAcquired,
    /// Stopped without finalizing. The job stays `running` for the next owner to resume.
    Abandoned(AbandonReason),
}

impl RunOutcome {
    pub fn handler_outcome(&self) -> HandlerOutcome {
        match self {
            RunOutcome::Finished(_) => HandlerOutcome::Success,
            RunOutcome::AlreadyTerminal(_)
            | RunOutcome::LockNotAcquired
            | RunOutcome::Abandoned(AbandonReason::LockLost) => HandlerOutcome::Drop,
            RunOutcome::Abandoned(AbandonReason::Shutdown) => HandlerOutcome::Retry,
        }
    }
}

/// Result of trying to take an import job for this instance.
pub enum Claim {
    Acquired(ClaimedJob),
    Declined(RunOutcome),
}

/// A job whose lock this instance holds, with lease renewal already running.
pub struct ClaimedJob {
    job: ImportJob,
    key: String,
    owner: String,
    keeper: LeaseKeeper,
}

impl ClaimedJob {
    pub fn job_id(&self) -> &str {
        &self.job.job_id
    }
}

pub fn lock_key(job_id: &str) -> String {
    format!("import-job:{job_id}")
}

trait TransientError: Display {
    fn is_transient(&self) -> bool;
}

impl TransientError for ProductStoreError {
    fn is_transient(&self) -> bool {
        ProductStoreError::is_transient(self)
    }
}

impl TransientError for JobStoreError {
    fn is_transient(&self) -> bool {
        JobStoreError::is_transient(self)
    }
}

impl TransientError for ImportSourceError {
    fn is_transient(&self) -> bool {
        matches!(self, ImportSourceError::Backend(_))
    }
}

enum Stop {
    Cancelled,
    Abandoned(AbandonReason),
}

enum Halt {
    Stop(Stop),
    Failed(String),
}

/// SKUs accepted and row numbers encountered so far in a run.
#[derive(Default)]
struct SeenRows {
    skus: HashSet<String>,
    row_numbers: HashSet<u64>,
}

impl SeenRows {
    fn contains_row(&self, row_number: u64) -> bool {
        self.row_numbers.contains(&row_number)
    }

    fn extend(&mut self, other: SeenRows) {
        self.skus.extend(other.skus);
        self.row_numbers.extend(other.row_numbers);
    }
}

#[derive(Default)]
struct BatchReport {
    succeeded: u64,
    errors: Vec<RowError>,
    seen: SeenRows,
}

struct ProgressClock {
    interval: Duration,
    last: Instant,
}

impl ProgressClock {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Instant::now(),
        }
    }

    fn due(&mut self) -> bool {
        if self.last.elapsed() < self.interval {
            return false;
        }
        self.last = Instant::now();
        true
    }
}

pub struct ImportCoordinator<TJobs, TSource, TStore, TLock>
where
    TJobs: ImportJobStore + 'static,
    TSource: ImportSource + 'static,
    TStore: ProductStore + 'static,
    TLock: DistributedLock + 'static,
{
    instance_id: String,
    jobs: Arc<TJobs>,
    source: Arc<TSource>,
    products: Arc<TStore>,
    lock: Arc<TLock>,
    emitter: EventEmitter,
    settings: ImportSettings,
    shutdown: CancellationToken,
}

impl<TJobs, TSource, TStore, TLock> ImportCoordinator<TJobs, TSource, TStore, TLock>
where
    TJobs: ImportJobStore + 'static,
    TSource: ImportSource + 'static,
    TStore: ProductStore + 'static,
    TLock: DistributedLock + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        instance_id: impl Into<String>,
        jobs: Arc<TJobs>,
        source: Arc<TSource>,
        products: Arc<TStore>,
        lock: Arc<TLock>,
        emitter: EventEmitter,
        settings: ImportSettings,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            instance_id: instance_id.into(),
            jobs,
            source,
            products,
            lock,
            emitter,
            settings,
            shutdown,
        }
    }

    /// Claim the job and drive it to the end within the caller's task.
    #[tracing::instrument(
        name = "import.run",
        skip_all,
        fields(job_id = %payload.job_id, mode = ?payload.mode, event_id = %meta.event_id)
    )]
    pub async fn handle(
        &self,
        meta: &EventMeta,
        payload: ImportJobCreated,
    ) -> Result<RunOutcome, ImportError> {
        match self.claim(meta, payload).await? {
            Claim::Acquired(claimed) => self.run_claimed(claimed).await,
            Claim::Declined(outcome) => Ok(outcome),
        }
    }

    /// Record the job if it is new and take its lock.
    #[tracing::instrument(
        name = "import.claim",
        skip_all,
        fields(job_id = %payload.job_id, event_id = %meta.event_id)
    )]
    pub async fn claim(
        &self,
        meta: &EventMeta,
        payload: ImportJobCreated,
    ) -> Result<Claim, ImportError> {
        let pending = ImportJob::pending(
            payload.job_id,
            payload.source_ref,
            payload.total_rows,
            payload.mode,
            meta.correlation_id.clone(),
            meta.timestamp,
        );
        let job = self.jobs.create_if_absent(pending).await?;
        if job.status.is_terminal() {
            info!(status = %job.status, "import job already finished");
            return Ok(Claim::Declined(RunOutcome::AlreadyTerminal(job.status)));
        }

        let key = lock_key(&job.job_id);
        let owner = format!("{}:{}", self.instance_id, Uuid::new_v4());
        if !self.lock.acquire(&key, &owner, self.settings.lock_ttl).await? {
            info!("another worker is processing this import job");
            return Ok(Claim::Declined(RunOutcome::LockNotAcquired));
        }

        let keeper = LeaseKeeper::spawn(
            self.lock.clone(),
            key.clone(),
            owner.clone(),
            self.settings.lock_ttl,
        );
        Ok(Claim::Acquired(ClaimedJob {
            job,
            key,
            owner,
            keeper,
        }))
    }

    /// Drive a claimed job, then stop renewing and release its lock.
    pub async fn run_claimed(&self, claimed: ClaimedJob) -> Result<RunOutcome, ImportError> {
        let ClaimedJob {
            job,
            key,
            owner,
            keeper,
        } = claimed;
        let result = self.run(&job.job_id, &owner, &keeper).await;
        keeper.stop().await;

        match self.lock.release(&key, &owner).await {
            Ok(true) => debug!("import lock released"),
            Ok(false) => debug!("import lock was no longer held"),
            Err(error) => warn!(%error, "import lock release failed, leaving it to expire"),
        }
        result
    }

    /// Drive a claimed job after its delivery was acknowledged. A run that would have
    /// asked for redelivery re-publishes `job.created` instead.
    #[tracing::instrument(
        name = "import.run_detached",
        skip_all,
        fields(job_id = %claimed.job.job_id)
    )]
    pub async fn run_detached(&self, claimed: ClaimedJob) {
        let job = claimed.job.clone();
        let outcome = match self.run_claimed(claimed).await {
            Ok(outcome) => {
                info!(?outcome, "detached import run ended");
                outcome.handler_outcome()
            }
            Err(error) => {
                error!(%error, "detached import run failed");
                error.handler_outcome()
            }
        };
        if outcome == HandlerOutcome::Retry {
            warn!("import job interrupted, re-publishing job.created");
            let created = ImportIntent::PublishJobCreated {
                payload: ImportJobCreated {
                    job_id: job.job_id.clone(),
                    source_ref: job.source_ref.clone(),
                    total_rows: job.total_rows,
                    mode: job.mode,
                },
            };
            self.publish(&job, created).await;
        }
    }

    async fn run(
        &self,
        job_id: &str,
        owner: &str,
        keeper: &LeaseKeeper,
    ) -> Result<RunOutcome, ImportError> {
        let mut job = self
            .jobs
            .get(job_id)
            .await?
            .ok_or_else(|| JobStoreError::NotFound(job_id.to_string()))?;
        if job.status.is_terminal() {
            return Ok(RunOutcome::AlreadyTerminal(job.status));
        }
        let resumed = job.status == ImportStatus::Running;
        job.start(owner, Utc::now())?;
        self.retry("save job", || self.jobs.save(&job)).await?;
        info!(
            resumed,
            processed_rows = job.processed_rows,
            total_rows = job.total_rows,
            "import job running"
        );

        let mut progress = ProgressClock::new(self.settings.progress_interval);

        if job.mode == ImportMode::AllOrNothing && job.processed_rows == 0 {
            match self.validate_all(&job, keeper, &mut progress).await {
                Ok(errors) if errors.is_empty() => {
                    info!("all rows valid, committing");
                }
                Ok(errors) => {
                    let rejected = errors.len();
                    job.record_errors(errors);
                    return self
                        .fail(job, format!("validation failed: {rejected} rows rejected"), 0)
                        .await;
                }
                Err(Halt::Stop(stop)) => return self.stop(job, stop).await,
                Err(Halt::Failed(reason)) => return self.fail(job, reason, 0).await,
            }
        }

        let mut seen = SeenRows::default();
        loop {
            match self.checkpoint(&job, keeper).await {
                Ok(Some(stop)) => return self.stop(job, stop).await,
                Ok(None) => {}
                Err(error) => {
                    let reason = format!("job state unavailable: {error}");
                    return self.fail_batch(job, reason).await;
                }
            }
            if job.processed_rows >= job.total_rows {
                break;
            }

            let offset = job.processed_rows;
            let rows = match self.read_batch(&job, offset).await {
                Ok(rows) => rows,
                Err(error) => {
                    let reason = format!("import source unavailable: {error}");
                    return self.fail_batch(job, reason).await;
                }
            };
            if rows.is_empty() {
                warn!(offset, "import source ended before the expected row count");
                break;
            }

            let applied = match job.mode {
                ImportMode::ValidateOnly => {
                    self.retry("validate batch", || {
                        self.validate_batch(&job.job_id, &rows, &seen)
                    })
                    .await
                }
                ImportMode::PartialImport | ImportMode::AllOrNothing => {
                    self.retry("import batch", || {
                        self.import_batch(&job.job_id, &rows, &seen)
                    })
                    .await
                }
            };
            let report = match applied {
                Ok(report) => report,
                Err(error) => {
                    let reason = format!("batch at row {offset} failed: {error}");
                    return self.fail_batch(job, reason).await;
                }
            };

            seen.extend(report.seen);
            let rejected = report.errors.len();
            job.record_batch(rows.len() as u64, report.succeeded, report.errors);
            debug!(offset, rows = rows.len(), rejected, "batch processed");

            if job.mode == ImportMode::AllOrNothing && rejected > 0 {
                let reason = format!("{rejected} rows failed during commit at row {offset}");
                return self.fail_batch(job, reason).await;
            }

            match self.retry("save job", || self.jobs.save(&job)).await {
                Ok(()) => {}
                Err(JobStoreError::Terminal { .. }) => {
                    warn!("job finalized by another worker");
                    return Ok(RunOutcome::Abandoned(AbandonReason::LockLost));
                }
                Err(error) => {
                    let reason = format!("progress not saved: {error}");
                    return self.fail_batch(job, reason).await;
                }
            }

            if progress.due() {
                let processed = job.processed_rows;
                self.publish(&job, ImportIntent::progress(&job, ImportPhase::Importing, processed))
                    .await;
            }
        }

        job.complete(Utc::now())?;
        info!(
            success_count = job.success_count,
            failure_count = job.failure_count,
            "import job completed"
        );
        let intent = ImportIntent::completed(&job);
        self.finalize(job, intent).await
    }

    /// Validate every row of the source without writing. Returns the rejected rows.
    async fn validate_all(
        &self,
        job: &ImportJob,
        keeper: &LeaseKeeper,
        progress: &mut ProgressClock,
    ) -> Result<Vec<RowError>, Halt> {
        let mut seen = SeenRows::default();
        let mut errors = Vec::new();
        let mut offset = 0;

        while offset < job.total_rows {
            match self.checkpoint(job, keeper).await {
                Ok(Some(stop)) => return Err(Halt::Stop(stop)),
                Ok(None) => {}
                Err(error) => return Err(Halt::Failed(format!("job state unavailable: {error}"))),
            }
            let rows = self
                .read_batch(job, offset)
                .await
                .map_err(|error| Halt::Failed(format!("import source unavailable: {error}")))?;
            if rows.is_empty() {
                break;
            }
            let report = self
                .retry("validate batch", || self.validate_batch(&job.job_id, &rows, &seen))
                .await
                .map_err(|error| {
                    Halt::Failed(format!("validation at row {offset} failed: {error}"))
                })?;
            seen.extend(report.seen);
            errors.extend(report.errors);
            offset += rows.len() as u64;

            if progress.due() {
                self.publish(job, ImportIntent::progress(job, ImportPhase::Validating, offset))
                    .await;
            }
        }
        Ok(errors)
    }

    async fn checkpoint(
        &self,
        job: &ImportJob,
        keeper: &LeaseKeeper,
    ) -> Result<Option<Stop>, JobStoreError> {
        if keeper.is_lost() {
            return Ok(Some(Stop::Abandoned(AbandonReason::LockLost)));
        }
        if self.shutdown.is_cancelled() {
            return Ok(Some(Stop::Abandoned(AbandonReason::Shutdown)));
        }
        let current = self
            .retry("read job", || self.jobs.get(&job.job_id))
            .await?
            .ok_or_else(|| JobStoreError::NotFound(job.job_id.clone()))?;
        if current.status.is_terminal() {
            return Ok(Some(Stop::Abandoned(AbandonReason::LockLost)));
        }
        if current.cancel_requested {
            return Ok(Some(Stop::Cancelled));
        }
        Ok(None)
    }

    /// Read the next batch, never past `total_rows` even if the source holds more.
    async fn read_batch(
        &self,
        job: &ImportJob,
        offset: u64,
    ) -> Result<Vec<ImportRow>, ImportSourceError> {
        let remaining = job.total_rows.saturating_sub(offset);
        let limit = usize::try_from(remaining)
            .unwrap_or(usize::MAX)
            .min(self.settings.batch_size);
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.retry("read batch", || {
            self.source.read_batch(&job.source_ref, offset, limit)
        })
        .await
    }

    /// Row rules plus row number and SKU uniqueness against earlier rows and the catalog.
    async fn validate_batch(
        &self,
        job_id: &str,
        rows: &[ImportRow],
        seen: &SeenRows,
    ) -> Result<BatchReport, ProductStoreError> {
        let mut report = BatchReport::default();
        for row in rows {
            match self.check_row(job_id, row, seen, &report.seen).await? {
                Ok(sku) => {
                    report.succeeded += 1;
                    report.seen.skus.insert(sku);
                }
                Err(rejection) => report.errors.push(row.rejection(rejection)),
            }
            report.seen.row_numbers.insert(row.row_number);
        }
        Ok(report)
    }

    async fn check_row(
        &self,
        job_id: &str,
        row: &ImportRow,
        seen: &SeenRows,
        batch: &SeenRows,
    ) -> Result<Result<String, RowRejection>, ProductStoreError> {
        if seen.contains_row(row.row_number) || batch.contains_row(row.row_number) {
            return Ok(Err(RowRejection::DuplicateRowNumber(row.row_number)));
        }
        if let Err(rejection) = validate_row(row) {
            return Ok(Err(rejection));
        }
        let sku = row.sku().unwrap_or_default().to_string();
        if seen.skus.contains(&sku) || batch.skus.contains(&sku) {
            return Ok(Err(RowRejection::DuplicateSku(sku)));
        }
        let existing = self.products.find_by_sku(&sku).await?;
        if existing.is_some_and(|p| p.import_job_id.as_deref() != Some(job_id)) {
            return Ok(Err(RowRejection::DuplicateSku(sku)));
        }
        Ok(Ok(sku))
    }

    /// Insert the batch. Product ids are derived from the row, so re-running a batch
    /// after a partial failure only inserts what is missing.
    async fn import_batch(
        &self,
        job_id: &str,
        rows: &[ImportRow],
        seen: &SeenRows,
    ) -> Result<BatchReport, ProductStoreError> {
        let mut report = BatchReport::default();
        let now = Utc::now();
        for row in rows {
            let repeated = seen.contains_row(row.row_number)
                || !report.seen.row_numbers.insert(row.row_number);
            if repeated {
                let rejection = RowRejection::DuplicateRowNumber(row.row_number);
                report.errors.push(row.rejection(rejection));
                continue;
            }
            let product = match to_product(row, job_id, now) {
                Ok(product) => product,
                Err(rejection) => {
                    report.errors.push(row.rejection(rejection));
                    continue;
                }
            };
            let (product_id, sku) = (product.id.clone(), product.sku.clone());
            match self.products.insert(product).await {
                Ok(()) => report.succeeded += 1,
                Err(ProductStoreError::AlreadyExists(_)) => {
                    if self.imported_earlier(job_id, &product_id, &sku).await? {
                        report.succeeded += 1;
                    } else {
                        let rejection = RowRejection::DuplicateRowNumber(row.row_number);
                        report.errors.push(row.rejection(rejection));
                    }
                }
                Err(ProductStoreError::DuplicateSku(sku)) => {
                    report.errors.push(row.rejection(RowRejection::DuplicateSku(sku)));
                }
                Err(error) => return Err(error),
            }
        }
        Ok(report)
    }

    /// Whether a product already stored under this id came from this row on a previous attempt.
    async fn imported_earlier(
        &self,
        job_id: &str,
        product_id: &str,
        sku: &str,
    ) -> Result<bool, ProductStoreError> {
        let stored = self.products.find_by_id(product_id).await?;
        Ok(stored.is_some_and(|p| p.sku == sku && p.import_job_id.as_deref() == Some(job_id)))
    }

    async fn stop(&self, mut job: ImportJob, stop: Stop) -> Result<RunOutcome, ImportError> {
        match stop {
            Stop::Cancelled => {
                job.cancel(Utc::now())?;
                info!(processed_rows = job.processed_rows, "import job cancelled");
                let intent = ImportIntent::cancelled(&job);
                self.finalize(job, intent).await
            }
            Stop::Abandoned(reason) => {
                warn!(?reason, processed_rows = job.processed_rows, "import job abandoned");
                Ok(RunOutcome::Abandoned(reason))
            }
        }
    }

    /// Fail after a batch-level error. All-or-nothing jobs roll back what they committed.
    async fn fail_batch(
        &self,
        mut job: ImportJob,
        reason: String,
    ) -> Result<RunOutcome, ImportError> {
        if job.mode != ImportMode::AllOrNothing {
            return self.fail(job, reason, 0).await;
        }
        match self
            .retry("roll back import", || self.products.delete_by_import_job(&job.job_id))
            .await
        {
            Ok(removed) => {
                info!(removed, "all-or-nothing import rolled back");
                job.success_count = 0;
                self.fail(job, reason, removed).await
            }
            Err(rollback_error) => {
                error!(error = %rollback_error, "all-or-nothing rollback incomplete");
                let reason = format!("{reason}; rollback incomplete: {rollback_error}");
                self.fail(job, reason, 0).await
            }
        }
    }

    async fn fail(
        &self,
        mut job: ImportJob,
        reason: String,
        rolled_back_rows: u64,
    ) -> Result<RunOutcome, ImportError> {
        error!(%reason, processed_rows = job.processed_rows, "import job failed");
        job.fail(reason, Utc::now())?;
        let intent = ImportIntent::failed(&job, rolled_back_rows);
        self.finalize(job, intent).await
    }

    /// Persist the terminal state, then publish. Nothing is published if the save fails.
    async fn finalize(
        &self,
        job: ImportJob,
        intent: ImportIntent,
    ) -> Result<RunOutcome, ImportError> {
        self.retry("finalize job", || self.jobs.save(&job)).await?;
        self.publish(&job, intent).await;
        Ok(RunOutcome::Finished(job.status))
    }

    async fn publish(&self, job: &ImportJob, intent: ImportIntent) {
        dispatch_intents(&self.emitter, job.correlation_id.as_deref(), vec![intent]).await;
    }

    async fn retry<T, E, F, Fut>(&self, operation: &str, mut attempt: F) -> Result<T, E>
    where
        E: TransientError,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut backoff = ExponentialBuilder::default()
            .with_min_delay(self.settings.retry_min_delay)
            .with_max_delay(self.settings.retry_min_delay * 16)
            .with_max_times(self.settings.max_batch_retries)
            .with_jitter()
            .build();
        loop {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_transient() => match backoff.next() {
                    Some(delay) => {
                        warn!(operation, %error, delay_ms = delay.as_millis() as u64, "retrying");
                        tokio::time::sleep(delay).await;
                    }
                    None => return Err(error),
                },
                Err(error) => return Err(error),
            }
        }
    }
}
