// EventPublisher that posts CloudEvents to the Dapr sidecar's pub/sub API.

use crate::shared::infrastructure::event_publisher::{EventPublisher, OutboundEvent, PublishError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

#[derive(Serialize)]
struct CloudEvent<'a> {
    specversion: &'static str,
    #[serde(rename = "type")]
    event_type: &'a str,
    source: &'a str,
    id: &'a str,
    time: String,
    datacontenttype: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlationid: Option<&'a str>,
    data: &'a serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct DaprEventPublisher {
    client: Client,
    dapr_url: String,
    pubsub_name: String,
    source: String,
}

impl DaprEventPublisher {
    pub fn new(
        dapr_url: impl Into<String>,
        pubsub_name: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            dapr_url: dapr_url.into(),
            pubsub_name: pubsub_name.into(),
            source: source.into(),
        }
    }

    fn publish_url(&self, topic: &str) -> String {
        format!(
            "{}/v1.0/publish/{}/{}",
            self.dapr_url.trim_end_matches('/'),
            self.pubsub_name,
            topic
        )
    }
}

#[async_trait]
impl EventPublisher for DaprEventPublisher {
    async fn publish(&self, event: &OutboundEvent) -> Result<(), PublishError> {
        let body = CloudEvent {
            specversion: "1.0",
            event_type: &event.topic,
            source: &self.source,
            id: &event.event_id,
            time: event.occurred_at.to_rfc3339(),
            datacontenttype: "application/json",
            correlationid: event.correlation_id.as_deref(),
            data: &event.data,
        };

        let mut request = self
            .client
            .post(self.publish_url(&event.topic))
            .header("content-type", "application/cloudevents+json")
            .json(&body);
        if let Some(correlation_id) = &event.correlation_id {
            request = request.header("x-correlation-id", correlation_id);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(PublishError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
