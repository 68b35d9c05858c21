// Composition of adapters and use case handlers shared by every route.
//
// Storage adapters are the in-memory ones; the publisher is injected so the
// binary can hand in the Dapr adapter while tests inspect an in-memory one.

use crate::modules::bulk_import::use_cases::cancel_import::handler::CancelImportHandler;
use crate::modules::bulk_import::use_cases::delete_import::handler::DeleteImportHandler;
use crate::modules::bulk_import::use_cases::get_import_job::handler::GetImportJobHandler;
use crate::modules::bulk_import::use_cases::list_import_jobs::handler::ListImportJobsHandler;
use crate::modules::bulk_import::use_cases::retry_import::handler::RetryImportHandler;
use crate::modules::bulk_import::use_cases::run_import::handler::{
    ImportCoordinator, ImportSettings,
};
use crate::modules::bulk_import::use_cases::submit_import::handler::SubmitImportHandler;
use crate::modules::catalog_sync::use_cases::denormalize::Denormalizer;
use crate::modules::catalog_sync::use_cases::sync_analytics::handler::SyncAnalyticsHandler;
use crate::modules::catalog_sync::use_cases::sync_inventory::handler::SyncInventoryHandler;
use crate::modules::catalog_sync::use_cases::sync_qa::handler::SyncQaHandler;
use crate::modules::catalog_sync::use_cases::sync_reviews::handler::SyncReviewsHandler;
use crate::shared::config::ServiceConfig;
use crate::shared::infrastructure::distributed_lock::in_memory::InMemoryLock;
use crate::shared::infrastructure::event_publisher::{EventEmitter, EventPublisher};
use crate::shared::infrastructure::idempotency::in_memory::InMemoryLedger;
use crate::shared::infrastructure::import_jobs::in_memory::InMemoryImportJobStore;
use crate::shared::infrastructure::import_source::in_memory::InMemoryImportSource;
use crate::shared::infrastructure::product_store::in_memory::InMemoryProductStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

pub type Coordinator = ImportCoordinator<
    InMemoryImportJobStore,
    InMemoryImportSource,
    InMemoryProductStore,
    InMemoryLock,
>;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub products: Arc<InMemoryProductStore>,
    pub ledger: Arc<InMemoryLedger>,
    pub import_jobs: Arc<InMemoryImportJobStore>,
    pub import_source: Arc<InMemoryImportSource>,
    pub import_lock: Arc<InMemoryLock>,
    pub emitter: EventEmitter,
    /// Import runs started from `job.created`, awaited on shutdown.
    pub import_runs: TaskTracker,
    pub sync_reviews: Arc<SyncReviewsHandler<InMemoryProductStore, InMemoryLedger>>,
    pub sync_inventory: Arc<SyncInventoryHandler<InMemoryProductStore, InMemoryLedger>>,
    pub sync_analytics: Arc<SyncAnalyticsHandler<InMemoryProductStore, InMemoryLedger>>,
    pub sync_qa: Arc<SyncQaHandler<InMemoryProductStore, InMemoryLedger>>,
    pub run_import: Arc<Coordinator>,
    pub submit_import: Arc<SubmitImportHandler<InMemoryImportJobStore, InMemoryImportSource>>,
    pub cancel_import: Arc<CancelImportHandler<InMemoryImportJobStore>>,
    pub get_import_job: Arc<GetImportJobHandler<InMemoryImportJobStore>>,
    pub list_import_jobs: Arc<ListImportJobsHandler<InMemoryImportJobStore>>,
    pub retry_import: Arc<RetryImportHandler<InMemoryImportJobStore>>,
    pub delete_import: Arc<DeleteImportHandler<InMemoryImportJobStore, InMemoryImportSource>>,
}

impl AppState {
    pub fn in_memory(
        config: ServiceConfig,
        publisher: Arc<dyn EventPublisher>,
        shutdown: CancellationToken,
    ) -> Self {
        let products = Arc::new(InMemoryProductStore::new());
        let ledger = Arc::new(InMemoryLedger::new());
        let import_jobs = Arc::new(InMemoryImportJobStore::new());
        let import_source = Arc::new(InMemoryImportSource::new());
        let lock = Arc::new(InMemoryLock::new());
        let emitter = EventEmitter::new(publisher, config.publish_timeout());

        let engine = |area: &str| {
            Denormalizer::new(
                format!("{}.{area}", config.service_name),
                products.clone(),
                ledger.clone(),
                emitter.clone(),
                config.max_conflict_retries,
            )
        };

        let run_import = ImportCoordinator::new(
            config.instance_id.clone(),
            import_jobs.clone(),
            import_source.clone(),
            products.clone(),
            lock.clone(),
            emitter.clone(),
            ImportSettings::from_config(&config),
            shutdown,
        );

        Self {
            sync_reviews: Arc::new(SyncReviewsHandler::new(engine("reviews"))),
            sync_inventory: Arc::new(SyncInventoryHandler::new(engine("inventory"))),
            sync_analytics: Arc::new(SyncAnalyticsHandler::new(engine("analytics"))),
            sync_qa: Arc::new(SyncQaHandler::new(engine("qa"))),
            run_import: Arc::new(run_import),
            submit_import: Arc::new(SubmitImportHandler::new(
                import_jobs.clone(),
                import_source.clone(),
                emitter.clone(),
            )),
            cancel_import: Arc::new(CancelImportHandler::new(import_jobs.clone())),
            get_import_job: Arc::new(GetImportJobHandler::new(import_jobs.clone())),
            list_import_jobs: Arc::new(ListImportJobsHandler::new(import_jobs.clone())),
            retry_import: Arc::new(RetryImportHandler::new(import_jobs.clone(), emitter.clone())),
            delete_import: Arc::new(DeleteImportHandler::new(
                import_jobs.clone(),
                import_source.clone(),
            )),
            config: Arc::new(config),
            products,
            ledger,
            import_jobs,
            import_source,
            import_lock: lock,
            emitter,
            import_runs: TaskTracker::new(),
        }
    }
}
