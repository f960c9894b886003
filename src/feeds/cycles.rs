use super::{DeliveryError, StreamSink};
use crate::config::ApiKey;
use crate::models::StreamPayload;
use async_trait::async_trait;
use std::time::Duration;

pub const DEFAULT_WEBHOOK_URL: &str = "https://api.cycle.tools/api/Stream/SubmitStreamData";

/// Ingestion client for the Cycles stream API.
/// The key travels as the `api_key` query parameter.
pub struct CyclesClient {
    client: reqwest::Client,
    webhook_url: String,
    api_key: ApiKey,
}

impl CyclesClient {
    pub fn new(
        webhook_url: impl Into<String>,
        api_key: ApiKey,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            webhook_url: webhook_url.into(),
            api_key,
        })
    }
}

#[async_trait]
impl StreamSink for CyclesClient {
    async fn send(&self, stream_id: &str, value: f64, timestamp: &str) -> Result<(), DeliveryError> {
        let payload = StreamPayload::upsert(stream_id, value, timestamp);

        let response = self
            .client
            .post(&self.webhook_url)
            .query(&[("api_key", self.api_key.expose())])
            .json(&payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport {
                stream_id: stream_id.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(DeliveryError::Status {
                stream_id: stream_id.to_string(),
                status: status.as_u16(),
            })
        }
    }
}
