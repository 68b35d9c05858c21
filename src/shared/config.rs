// Service configuration.
//
// Values come from defaults overridden by `CATALOG__*` environment variables,
// for example `CATALOG__DAPR_HTTP_URL=http://localhost:3500`.

use serde::Deserialize;
use std::time::Duration;

pub const ENV_PREFIX: &str = "CATALOG";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServiceConfig {
    pub bind_address: String,
    pub service_name: String,
    pub instance_id: String,
    pub dapr_http_url: String,
    pub pubsub_name: String,
    pub publish_timeout_ms: u64,
    pub max_conflict_retries: usize,
    pub import_batch_size: usize,
    pub import_lock_ttl_secs: u64,
    pub import_progress_interval_secs: u64,
    pub import_max_batch_retries: usize,
    pub import_retry_min_delay_ms: u64,
    pub ledger_retention_hours: u64,
    pub ledger_prune_interval_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            service_name: "product-service".to_string(),
            instance_id: uuid::Uuid::now_v7().to_string(),
            dapr_http_url: "http://localhost:3500".to_string(),
            pubsub_name: "product-pubsub".to_string(),
            publish_timeout_ms: 5_000,
            max_conflict_retries: 3,
            import_batch_size: 100,
            import_lock_ttl_secs: 60,
            import_progress_interval_secs: 10,
            import_max_batch_retries: 3,
            import_retry_min_delay_ms: 200,
            ledger_retention_hours: 24 * 7,
            ledger_prune_interval_secs: 3_600,
        }
    }
}

impl ServiceConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }

    pub fn import_lock_ttl(&self) -> Duration {
        Duration::from_secs(self.import_lock_ttl_secs)
    }

    pub fn import_progress_interval(&self) -> Duration {
        Duration::from_secs(self.import_progress_interval_secs)
    }

    pub fn import_retry_min_delay(&self) -> Duration {
        Duration::from_millis(self.import_retry_min_delay_ms)
    }

    pub fn ledger_retention(&self) -> Duration {
        Duration::from_secs(self.ledger_retention_hours * 3_600)
    }

    pub fn ledger_prune_interval(&self) -> Duration {
        Duration::from_secs(self.ledger_prune_interval_secs)
    }
}
