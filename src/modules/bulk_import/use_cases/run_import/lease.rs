// Background renewal of an import job lock.
//
// Renews every third of the TTL until stopped. A renewal answered with `false`
// means another owner holds the lock now: the keeper records the loss and stops.

use crate::shared::infrastructure::distributed_lock::DistributedLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub struct LeaseKeeper {
    stop: CancellationToken,
    lost: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl LeaseKeeper {
    pub fn spawn<TLock>(lock: Arc<TLock>, key: String, owner: String, ttl: Duration) -> Self
    where
        TLock: DistributedLock + 'static,
    {
        let stop = CancellationToken::new();
        let lost = Arc::new(AtomicBool::new(false));
        let interval = (ttl / 3).max(Duration::from_millis(10));

        let task = {
            let stop = stop.clone();
            let lost = lost.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = stop.cancelled() => break,
                        _ = tokio::time::sleep(interval) => {}
                    }
                    match lock.renew(&key, &owner, ttl).await {
                        Ok(true) => debug!(key = %key, "import lock renewed"),
                        Ok(false) => {
                            warn!(key = %key, owner = %owner, "import lock lost");
                            lost.store(true, Ordering::SeqCst);
                            break;
                        }
                        Err(error) => warn!(key = %key, %error, "import lock renewal failed"),
                    }
                }
            })
        };

        Self { stop, lost, task }
    }

    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::SeqCst)
    }

    pub async fn stop(self) {
        self.stop.cancel();
        if let Err(error) = self.task.await {
            warn!(%error, "import lock renewal task ended abnormally");
        }
    }
}
