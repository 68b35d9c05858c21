// Background workers started by the binary.
//
// The ledger pruner removes processed-event records older than the retention
// window. A failed sweep is logged and tried again at the next tick.

use crate::shared::infrastructure::idempotency::ProcessedEventLedger;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub async fn prune_ledger_once<TLedger>(ledger: &TLedger, retention: Duration) -> usize
where
    TLedger: ProcessedEventLedger + ?Sized,
{
    let retention = chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::MAX);
    let cutoff = Utc::now()
        .checked_sub_signed(retention)
        .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);
    match ledger.prune_older_than(cutoff).await {
        Ok(0) => {
            debug!("no processed-event records to prune");
            0
        }
        Ok(removed) => {
            info!(removed, %cutoff, "pruned processed-event records");
            removed
        }
        Err(error) => {
            warn!(%error, "processed-event pruning failed");
            0
        }
    }
}

pub fn spawn_ledger_pruner<TLedger>(
    ledger: Arc<TLedger>,
    retention: Duration,
    every: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()>
where
    TLedger: ProcessedEventLedger + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every.max(Duration::from_secs(1)));
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    prune_ledger_once(ledger.as_ref(), retention).await;
                }
            }
        }
        debug!("ledger pruner stopped");
    })
}
