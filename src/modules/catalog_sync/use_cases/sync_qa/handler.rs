use crate::modules::catalog_sync::core::events::ProductRef;
use crate::modules::catalog_sync::core::qa::{QaChange, apply_qa_change};
use crate::modules::catalog_sync::use_cases::denormalize::{
    Computation, Denormalizer, SyncError, SyncOutcome, is_stale,
};
use crate::shared::core::envelope::EventMeta;
use crate::shared::core::product::DenormalizedChange;
use crate::shared::infrastructure::idempotency::ProcessedEventLedger;
use crate::shared::infrastructure::product_store::ProductStore;

pub struct SyncQaHandler<TStore, TLedger>
where
    TStore: ProductStore + 'static,
    TLedger: ProcessedEventLedger + 'static,
{
    engine: Denormalizer<TStore, TLedger>,
}

impl<TStore, TLedger> SyncQaHandler<TStore, TLedger>
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
        change: QaChange,
    ) -> Result<SyncOutcome, SyncError> {
        self.engine
            .process(meta, &ProductRef::Id(product_id.to_string()), |product, at| {
                if is_stale(product.qa_stats.last_updated, at) {
                    return Computation::Stale;
                }
                Computation::Apply {
                    change: DenormalizedChange::Qa(apply_qa_change(&product.qa_stats, change, at)),
                    intents: Vec::new(),
                }
            })
            .await
    }
}
