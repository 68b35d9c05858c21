use crate::modules::catalog_sync::core::badges::{MetricsSnapshot, evaluate};
use crate::modules::catalog_sync::core::events::ProductRef;
use crate::modules::catalog_sync::core::intents::{BadgeAssigned, BadgeRemoved, CatalogIntent};
use crate::modules::catalog_sync::use_cases::denormalize::{
    Computation, Denormalizer, SyncError, SyncOutcome, is_stale,
};
use crate::shared::core::envelope::EventMeta;
use crate::shared::core::product::DenormalizedChange;
use crate::shared::infrastructure::idempotency::ProcessedEventLedger;
use crate::shared::infrastructure::product_store::ProductStore;

pub struct SyncAnalyticsHandler<TStore, TLedger>
where
    TStore: ProductStore + 'static,
    TLedger: ProcessedEventLedger + 'static,
{
    engine: Denormalizer<TStore, TLedger>,
}

impl<TStore, TLedger> SyncAnalyticsHandler<TStore, TLedger>
where
    TStore: ProductStore + 'static,
    TLedger: ProcessedEventLedger + 'static,
{
    pub fn new(engine: Denormalizer<TStore, TLedger>) -> Self {
        Self { engine }
    }

    /// Snapshots are ordered per badge type: a sales snapshot never goes stale because of
    /// a newer views snapshot.
    pub async fn handle(
        &self,
        meta: &EventMeta,
        product_id: &str,
        snapshot: MetricsSnapshot,
    ) -> Result<SyncOutcome, SyncError> {
        let badge_type = snapshot.badge_type();
        self.engine
            .process(meta, &ProductRef::Id(product_id.to_string()), |product, at| {
                let evaluated_at = product.badge_evaluated_at.get(&badge_type).copied();
                if is_stale(evaluated_at, at) {
                    return Computation::Stale;
                }
                let evaluation = evaluate(&product.badges, snapshot, at);
                let mut intents = Vec::new();
                if let Some(badge) = &evaluation.assigned {
                    intents.push(CatalogIntent::PublishBadgeAssigned {
                        payload: BadgeAssigned {
                            product_id: product.id.clone(),
                            badge_type: badge.badge_type,
                            label: badge.label.clone(),
                            priority: badge.priority,
                            assigned_at: badge.assigned_at,
                        },
                    });
                }
                for (badge, reason) in &evaluation.removed {
                    intents.push(CatalogIntent::PublishBadgeRemoved {
                        payload: BadgeRemoved {
                            product_id: product.id.clone(),
                            badge_type: badge.badge_type,
                            reason: *reason,
                            removed_at: at,
                        },
                    });
                }
                Computation::Apply {
                    change: DenormalizedChange::Badges {
                        badges: evaluation.badges,
                        badge_type,
                        evaluated_at: at,
                    },
                    intents,
                }
            })
            .await
    }
}
