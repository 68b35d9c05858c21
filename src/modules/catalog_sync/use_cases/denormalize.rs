// Shared protocol for every denormalization handler.
//
// Purpose
// - Turn one inbound event into at most one applied field-group update on a product.
//
// Responsibilities
// - Skip events already recorded in the ledger or already applied to the document.
// - Resolve the product, let the caller compute the change, and write it conditionally.
// - Re-read and recompute on a version conflict, a bounded number of times.
// - Record the event in the ledger, then schedule derived events in the background. The
//   handler answers without waiting for the transport.
//
// Crash safety
// - The event id is written into the product document by the same conditional update
//   that applies the change. A crash before the ledger write is absorbed on redelivery
//   by `Product::has_applied`.

use crate::modules::catalog_sync::adapters::outbound::event_emitter::schedule_intents;
use crate::modules::catalog_sync::core::events::ProductRef;
use crate::modules::catalog_sync::core::intents::CatalogIntent;
use crate::shared::core::envelope::{EventMeta, HandlerOutcome};
use crate::shared::core::product::{DenormalizedChange, DenormalizedUpdate, Product};
use crate::shared::infrastructure::event_publisher::EventEmitter;
use crate::shared::infrastructure::idempotency::{LedgerError, ProcessedEventLedger};
use crate::shared::infrastructure::product_store::{ProductStore, ProductStoreError};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Result of computing a change against the current document.
#[derive(Debug, Clone, PartialEq)]
pub enum Computation {
    /// The event is older than the field it would update.
    Stale,
    Apply {
        change: DenormalizedChange,
        intents: Vec<CatalogIntent>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// `scheduled` derived events were handed to the emitter.
    Applied { scheduled: usize },
    Duplicate,
    Stale,
    ProductNotFound,
}

impl SyncOutcome {
    pub fn handler_outcome(&self) -> HandlerOutcome {
        match self {
            SyncOutcome::Applied { .. } | SyncOutcome::Duplicate | SyncOutcome::Stale => {
                HandlerOutcome::Success
            }
            SyncOutcome::ProductNotFound => HandlerOutcome::Drop,
        }
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] ProductStoreError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("gave up on product {product_id} after {attempts} conflicting updates")]
    ConflictRetriesExhausted { product_id: String, attempts: usize },
}

impl SyncError {
    /// Every failure that reaches the transport is worth a redelivery.
    pub fn handler_outcome(&self) -> HandlerOutcome {
        HandlerOutcome::Retry
    }
}

/// Collapse a handler result into the delivery outcome, logging failures.
pub fn into_handler_outcome(result: Result<SyncOutcome, SyncError>) -> HandlerOutcome {
    match result {
        Ok(outcome) => outcome.handler_outcome(),
        Err(error) => {
            warn!(%error, "denormalization failed, requesting redelivery");
            error.handler_outcome()
        }
    }
}

/// `true` when an event at `at` is strictly older than the field's last update.
pub fn is_stale(last_updated: Option<DateTime<Utc>>, at: DateTime<Utc>) -> bool {
    last_updated.is_some_and(|last| at < last)
}

pub struct Denormalizer<TStore, TLedger>
where
    TStore: ProductStore + 'static,
    TLedger: ProcessedEventLedger + 'static,
{
    consumer: String,
    products: Arc<TStore>,
    ledger: Arc<TLedger>,
    emitter: EventEmitter,
    max_attempts: usize,
}

impl<TStore, TLedger> Denormalizer<TStore, TLedger>
where
    TStore: ProductStore + 'static,
    TLedger: ProcessedEventLedger + 'static,
{
    pub fn new(
        consumer: impl Into<String>,
        products: Arc<TStore>,
        ledger: Arc<TLedger>,
        emitter: EventEmitter,
        max_attempts: usize,
    ) -> Self {
        Self {
            consumer: consumer.into(),
            products,
            ledger,
            emitter,
            max_attempts: max_attempts.max(1),
        }
    }

    #[tracing::instrument(
        name = "denormalize",
        skip_all,
        fields(consumer = %self.consumer, event_id = %meta.event_id, product = %target.label())
    )]
    pub async fn process<F>(
        &self,
        meta: &EventMeta,
        target: &ProductRef,
        compute: F,
    ) -> Result<SyncOutcome, SyncError>
    where
        F: Fn(&Product, DateTime<Utc>) -> Computation,
    {
        if self.ledger.has_processed(&self.consumer, &meta.event_id).await? {
            debug!("event already processed");
            return Ok(SyncOutcome::Duplicate);
        }

        for attempt in 1..=self.max_attempts {
            let Some(product) = self.resolve(target).await? else {
                warn!("product not found, dropping event");
                return Ok(SyncOutcome::ProductNotFound);
            };

            if product.has_applied(&meta.event_id) {
                debug!(product_id = %product.id, "event already applied to product");
                self.mark_processed(&meta.event_id).await?;
                return Ok(SyncOutcome::Duplicate);
            }

            let (change, intents) = match compute(&product, meta.timestamp) {
                Computation::Stale => {
                    info!(
                        product_id = %product.id,
                        timestamp = %meta.timestamp,
                        "skipping stale event"
                    );
                    self.mark_processed(&meta.event_id).await?;
                    return Ok(SyncOutcome::Stale);
                }
                Computation::Apply { change, intents } => (change, intents),
            };

            let update = DenormalizedUpdate {
                event_id: meta.event_id.clone(),
                change,
            };
            match self
                .products
                .apply_if_unchanged(&product.id, product.version, update)
                .await
            {
                Ok(version) => {
                    debug!(
                        product_id = %product.id,
                        version,
                        attempt,
                        "denormalized update applied"
                    );
                    if let Err(error) = self.mark_processed(&meta.event_id).await {
                        warn!(%error, "update applied but ledger write failed");
                    }
                    let correlation_id = meta.correlation_id.as_deref();
                    let scheduled = schedule_intents(&self.emitter, correlation_id, intents);
                    return Ok(SyncOutcome::Applied { scheduled });
                }
                Err(ProductStoreError::VersionMismatch { expected, actual }) => {
                    debug!(
                        product_id = %product.id,
                        expected,
                        actual,
                        attempt,
                        "version conflict, retrying"
                    );
                }
                Err(ProductStoreError::NotFound(_)) => {
                    warn!(
                        product_id = %product.id,
                        "product removed during update, dropping event"
                    );
                    return Ok(SyncOutcome::ProductNotFound);
                }
                Err(error) => return Err(error.into()),
            }
        }

        warn!(attempts = self.max_attempts, "conflict retries exhausted");
        Err(SyncError::ConflictRetriesExhausted {
            product_id: target.label().to_string(),
            attempts: self.max_attempts,
        })
    }

    async fn resolve(&self, target: &ProductRef) -> Result<Option<Product>, ProductStoreError> {
        match target {
            ProductRef::Id(id) => self.products.find_by_id(id).await,
            ProductRef::Sku { sku, product_id } => {
                if let Some(product) = self.products.find_by_sku(sku).await? {
                    return Ok(Some(product));
                }
                match product_id {
                    Some(id) => self.products.find_by_id(id).await,
                    None => Ok(None),
                }
            }
        }
    }

    async fn mark_processed(&self, event_id: &str) -> Result<(), LedgerError> {
        match self.ledger.mark_processed(&self.consumer, event_id).await {
            Ok(()) | Err(LedgerError::AlreadyProcessed { .. }) => Ok(()),
            Err(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod denormalizer_tests {
    use super::*;
    use crate::modules::catalog_sync::core::badges::RemovalReason;
    use crate::modules::catalog_sync::core::intents::BadgeRemoved;
    use crate::modules::catalog_sync::core::qa::{QaChange, apply_qa_change};
    use crate::shared::core::product::BadgeType;
    use crate::shared::infrastructure::event_publisher::in_memory::InMemoryEventPublisher;
    use crate::shared::infrastructure::event_publisher::{
        EventPublisher, OutboundEvent, PublishError,
    };
    use crate::shared::infrastructure::idempotency::in_memory::InMemoryLedger;
    use crate::shared::infrastructure::product_store::in_memory::InMemoryProductStore;
    use crate::tests::fixtures::events::meta;
    use crate::tests::fixtures::products::ProductBuilder;
    use rstest::{fixture, rstest};
    use std::time::Duration;

    const CONSUMER: &str = "product-service.qa";

    type BeforeEachReturn = (InMemoryProductStore, InMemoryLedger, Arc<InMemoryEventPublisher>);

    #[fixture]
    fn before_each() -> BeforeEachReturn {
        (
            InMemoryProductStore::new(),
            InMemoryLedger::new(),
            Arc::new(InMemoryEventPublisher::new()),
        )
    }

    fn engine(
        store: Arc<InMemoryProductStore>,
        ledger: Arc<InMemoryLedger>,
        publisher: Arc<InMemoryEventPublisher>,
        max_attempts: usize,
    ) -> Denormalizer<InMemoryProductStore, InMemoryLedger> {
        let emitter = EventEmitter::new(publisher, Duration::from_secs(1));
        Denormalizer::new(CONSUMER, store, ledger, emitter, max_attempts)
    }

    fn by_id(id: &str) -> ProductRef {
        ProductRef::Id(id.into())
    }

    fn add_question(product: &Product, at: DateTime<Utc>) -> Computation {
        if is_stale(product.qa_stats.last_updated, at) {
            return Computation::Stale;
        }
        Computation::Apply {
            change: DenormalizedChange::Qa(apply_qa_change(
                &product.qa_stats,
                QaChange::QuestionCreated,
                at,
            )),
            intents: vec![],
        }
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_apply_a_redelivered_event_once(before_each: BeforeEachReturn) {
        let (store, ledger, publisher) = before_each;
        let store = Arc::new(store);
        store.seed(ProductBuilder::new().id("p-1").build()).await;
        let engine = engine(store.clone(), Arc::new(ledger), publisher, 3);
        let meta = meta("evt-1");

        let mut outcomes = Vec::new();
        for _ in 0..5 {
            let outcome = engine.process(&meta, &by_id("p-1"), add_question).await.unwrap();
            outcomes.push(outcome);
        }

        assert_eq!(outcomes[0], SyncOutcome::Applied { scheduled: 0 });
        assert!(outcomes[1..].iter().all(|o| *o == SyncOutcome::Duplicate));
        let product = store.find_by_id("p-1").await.unwrap().unwrap();
        assert_eq!(product.qa_stats.total_questions, 1);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_absorb_a_redelivery_after_a_lost_ledger_write(
        before_each: BeforeEachReturn,
    ) {
        let (store, ledger, publisher) = before_each;
        let store = Arc::new(store);
        store.seed(ProductBuilder::new().id("p-1").build()).await;
        let first = engine(store.clone(), Arc::new(ledger), publisher.clone(), 3);
        first.process(&meta("evt-1"), &by_id("p-1"), add_question).await.unwrap();

        // A ledger that never saw the event, as after a crash between update and ledger write.
        let empty_ledger = Arc::new(InMemoryLedger::new());
        let second = engine(store.clone(), empty_ledger.clone(), publisher, 3);
        let outcome = second
            .process(&meta("evt-1"), &by_id("p-1"), add_question)
            .await
            .unwrap();

        assert_eq!(outcome, SyncOutcome::Duplicate);
        assert!(empty_ledger.has_processed(CONSUMER, "evt-1").await.unwrap());
        assert_eq!(store.find_by_id("p-1").await.unwrap().unwrap().qa_stats.total_questions, 1);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_retry_when_the_ledger_is_offline(before_each: BeforeEachReturn) {
        let (store, mut ledger, publisher) = before_each;
        let store = Arc::new(store);
        store.seed(ProductBuilder::new().id("p-1").build()).await;
        ledger.toggle_offline();
        let engine = engine(store.clone(), Arc::new(ledger), publisher, 3);

        let error = engine
            .process(&meta("evt-1"), &by_id("p-1"), add_question)
            .await
            .unwrap_err();

        assert!(matches!(error, SyncError::Ledger(LedgerError::Backend(_))));
        assert_eq!(store.find_by_id("p-1").await.unwrap().unwrap().version, 0);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_drop_an_event_for_an_unknown_product(before_each: BeforeEachReturn) {
        let (store, ledger, publisher) = before_each;
        let ledger = Arc::new(ledger);
        let engine = engine(Arc::new(store), ledger.clone(), publisher, 3);

        let outcome = engine
            .process(&meta("evt-1"), &by_id("nope"), add_question)
            .await
            .unwrap();

        assert_eq!(outcome, SyncOutcome::ProductNotFound);
        assert_eq!(outcome.handler_outcome(), HandlerOutcome::Drop);
        assert!(!ledger.has_processed(CONSUMER, "evt-1").await.unwrap());
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_mark_a_stale_event_processed_without_applying_it(
        before_each: BeforeEachReturn,
    ) {
        let (store, ledger, publisher) = before_each;
        let store = Arc::new(store);
        let ledger = Arc::new(ledger);
        let mut product = ProductBuilder::new().id("p-1").build();
        let event = meta("evt-old");
        product.qa_stats.last_updated = Some(event.timestamp + chrono::Duration::minutes(1));
        store.seed(product).await;
        let engine = engine(store.clone(), ledger.clone(), publisher, 3);

        let outcome = engine.process(&event, &by_id("p-1"), add_question).await.unwrap();

        assert_eq!(outcome, SyncOutcome::Stale);
        assert!(ledger.has_processed(CONSUMER, "evt-old").await.unwrap());
        assert_eq!(store.find_by_id("p-1").await.unwrap().unwrap().version, 0);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_resolve_by_sku_then_fall_back_to_product_id(before_each: BeforeEachReturn) {
        let (store, ledger, publisher) = before_each;
        let store = Arc::new(store);
        store.seed(ProductBuilder::new().id("p-1").sku("SKU-1").build()).await;
        let engine = engine(store.clone(), Arc::new(ledger), publisher, 3);

        let by_sku = ProductRef::Sku {
            sku: "SKU-1".into(),
            product_id: None,
        };
        let by_fallback = ProductRef::Sku {
            sku: "SKU-RENAMED".into(),
            product_id: Some("p-1".into()),
        };
        let unknown = ProductRef::Sku {
            sku: "SKU-RENAMED".into(),
            product_id: None,
        };

        let found = engine.process(&meta("e-1"), &by_sku, add_question).await.unwrap();
        assert!(matches!(found, SyncOutcome::Applied { .. }));
        let fallback = engine.process(&meta("e-2"), &by_fallback, add_question).await.unwrap();
        assert!(matches!(fallback, SyncOutcome::Applied { .. }));
        let missing = engine.process(&meta("e-3"), &unknown, add_question).await.unwrap();
        assert_eq!(missing, SyncOutcome::ProductNotFound);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_retry_concurrent_updates_on_version_conflict(before_each: BeforeEachReturn) {
        let (store, ledger, publisher) = before_each;
        let store = Arc::new(store);
        store.seed(ProductBuilder::new().id("p-1").build()).await;
        store.set_delay_update_ms(20);
        let engine = engine(store.clone(), Arc::new(ledger), publisher, 3);
        let target = by_id("p-1");
        let (first_meta, second_meta) = (meta("evt-1"), meta("evt-2"));

        let (first, second) = tokio::join!(
            engine.process(&first_meta, &target, add_question),
            engine.process(&second_meta, &target, add_question)
        );

        assert!(matches!(first.unwrap(), SyncOutcome::Applied { .. }));
        assert!(matches!(second.unwrap(), SyncOutcome::Applied { .. }));
        let product = store.find_by_id("p-1").await.unwrap().unwrap();
        assert_eq!(product.qa_stats.total_questions, 2);
        assert_eq!(product.version, 2);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_surface_exhausted_conflict_retries_as_retry(before_each: BeforeEachReturn) {
        let (store, ledger, publisher) = before_each;
        let store = Arc::new(store);
        store.seed(ProductBuilder::new().id("p-1").build()).await;
        store.set_delay_update_ms(20);
        let engine = engine(store.clone(), Arc::new(ledger), publisher, 1);
        let target = by_id("p-1");
        let (first_meta, second_meta) = (meta("evt-1"), meta("evt-2"));

        let (first, second) = tokio::join!(
            engine.process(&first_meta, &target, add_question),
            engine.process(&second_meta, &target, add_question)
        );

        let errors: Vec<_> = [first, second].into_iter().filter_map(Result::err).collect();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], SyncError::ConflictRetriesExhausted { attempts: 1, .. }));
        assert_eq!(errors[0].handler_outcome(), HandlerOutcome::Retry);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_retry_when_the_store_is_offline(before_each: BeforeEachReturn) {
        let (mut store, ledger, publisher) = before_each;
        store.toggle_offline();
        let engine = engine(Arc::new(store), Arc::new(ledger), publisher, 3);

        let error = engine
            .process(&meta("evt-1"), &by_id("p-1"), add_question)
            .await
            .unwrap_err();

        assert!(matches!(error, SyncError::Store(ProductStoreError::Backend(_))));
        assert_eq!(error.handler_outcome(), HandlerOutcome::Retry);
    }

    struct StalledPublisher;

    #[async_trait::async_trait]
    impl EventPublisher for StalledPublisher {
        async fn publish(&self, _event: &OutboundEvent) -> Result<(), PublishError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }

    fn add_question_and_announce(product: &Product, at: DateTime<Utc>) -> Computation {
        let announcement = CatalogIntent::PublishBadgeRemoved {
            payload: BadgeRemoved {
                product_id: product.id.clone(),
                badge_type: BadgeType::Trending,
                reason: RemovalReason::Expired,
                removed_at: at,
            },
        };
        match add_question(product, at) {
            Computation::Apply { change, .. } => Computation::Apply {
                change,
                intents: vec![announcement.clone(), announcement],
            },
            stale => stale,
        }
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_answer_without_waiting_for_a_stalled_publisher(
        before_each: BeforeEachReturn,
    ) {
        let (store, ledger, _) = before_each;
        let store = Arc::new(store);
        store.seed(ProductBuilder::new().id("p-1").build()).await;
        let emitter = EventEmitter::new(Arc::new(StalledPublisher), Duration::from_secs(5));
        let engine = Denormalizer::new(CONSUMER, store.clone(), Arc::new(ledger), emitter, 3);
        let target = by_id("p-1");

        let outcome = tokio::time::timeout(
            Duration::from_secs(1),
            engine.process(&meta("evt-1"), &target, add_question_and_announce),
        )
        .await
        .expect("handler waited on the publisher")
        .unwrap();

        assert_eq!(outcome, SyncOutcome::Applied { scheduled: 2 });
        let product = store.find_by_id("p-1").await.unwrap().unwrap();
        assert_eq!(product.qa_stats.total_questions, 1);
    }
}
