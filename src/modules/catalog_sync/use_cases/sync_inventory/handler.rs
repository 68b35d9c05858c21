use crate::modules::catalog_sync::core::availability::{StockLevel, next_availability};
use crate::modules::catalog_sync::core::events::ProductRef;
use crate::modules::catalog_sync::core::intents::{BackInStock, CatalogIntent};
use crate::modules::catalog_sync::use_cases::denormalize::{
    Computation, Denormalizer, SyncError, SyncOutcome, is_stale,
};
use crate::shared::core::envelope::EventMeta;
use crate::shared::core::product::{AvailabilityState, DenormalizedChange};
use crate::shared::infrastructure::idempotency::ProcessedEventLedger;
use crate::shared::infrastructure::product_store::ProductStore;

pub struct SyncInventoryHandler<TStore, TLedger>
where
    TStore: ProductStore + 'static,
    TLedger: ProcessedEventLedger + 'static,
{
    engine: Denormalizer<TStore, TLedger>,
}

impl<TStore, TLedger> SyncInventoryHandler<TStore, TLedger>
where
    TStore: ProductStore + 'static,
    TLedger: ProcessedEventLedger + 'static,
{
    pub fn new(engine: Denormalizer<TStore, TLedger>) -> Self {
        Self { engine }
    }

    /// Back-in-stock is decided against the stored previous status, read in the same
    /// attempt as the write it is applied with.
    pub async fn handle(
        &self,
        meta: &EventMeta,
        target: &ProductRef,
        level: StockLevel,
    ) -> Result<SyncOutcome, SyncError> {
        self.engine
            .process(meta, target, |product, at| {
                let previous = product.availability_status.as_ref();
                if is_stale(previous.map(|p| p.last_updated), at) {
                    return Computation::Stale;
                }
                let next = next_availability(previous, level, at);
                let mut intents = Vec::new();
                if next.back_in_stock {
                    intents.push(CatalogIntent::PublishBackInStock {
                        payload: BackInStock {
                            product_id: product.id.clone(),
                            sku: product.sku.clone(),
                            product_name: product.name.clone(),
                            previous_status: next.previous.unwrap_or(AvailabilityState::OutOfStock),
                            status: next.status.status,
                            available_quantity: next.status.available_quantity,
                            occurred_at: at,
                        },
                    });
                }
                Computation::Apply {
                    change: DenormalizedChange::Availability(next.status),
                    intents,
                }
            })
            .await
    }
}
