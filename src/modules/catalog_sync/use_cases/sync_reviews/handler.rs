use crate::modules::catalog_sync::core::events::ProductRef;
use crate::modules::catalog_sync::core::reviews::{ReviewChange, apply_review_change};
use crate::modules::catalog_sync::use_cases::denormalize::{
    Computation, Denormalizer, SyncError, SyncOutcome, is_stale,
};
use crate::shared::core::envelope::EventMeta;
use crate::shared::core::product::DenormalizedChange;
use crate::shared::infrastructure::idempotency::ProcessedEventLedger;
use crate::shared::infrastructure::product_store::ProductStore;

pub struct SyncReviewsHandler<TStore, TLedger>
where
    TStore: ProductStore + 'static,
    TLedger: ProcessedEventLedger + 'static,
{
    engine: Denormalizer<TStore, TLedger>,
}

impl<TStore, TLedger> SyncReviewsHandler<TStore, TLedger>
where
    TStore: ProductStore + 'static,
    TLedger: ProcessedEventLedger + 'static,
{
    pub fn new(engine: Denormalizer<TStore, TLedger>) -> Self {
        Self { engine }
    }

    pub async fn handle(
        &self,
        meta: &EventMeta,
        product_id: &str,
        change: ReviewChange,
    ) -> Result<SyncOutcome, SyncError> {
        self.engine
            .process(meta, &ProductRef::Id(product_id.to_string()), |product, at| {
                let current = &product.review_aggregates;
                if is_stale(current.last_updated, at) {
                    return Computation::Stale;
                }
                Computation::Apply {
                    change: DenormalizedChange::Reviews(apply_review_change(current, change, at)),
                    intents: Vec::new(),
                }
            })
            .await
    }
}
