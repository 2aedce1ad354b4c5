// Gateway client - forwards subscriptions to an OPC UA protocol gateway
use crate::application::subscription::SubscriptionClient;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MonitoredNode<'a> {
    node_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubscribeRequest<'a> {
    nodes: Vec<MonitoredNode<'a>>,
    sampling_ms: u64,
}

/// The gateway owns the protocol session and posts samples back to
/// `POST /samples`.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    base_url: String,
    client: reqwest::Client,
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn subscriptions_url(&self) -> String {
        format!("{}/subscriptions", self.base_url)
    }
}

#[async_trait]
impl SubscriptionClient for GatewayClient {
    async fn subscribe(&self, tags: &[String], interval_ms: u64) -> Result<()> {
        let request = SubscribeRequest {
            nodes: tags.iter().map(|tag| MonitoredNode { node_id: tag }).collect(),
            sampling_ms: interval_ms,
        };

        let response = self
            .client
            .post(self.subscriptions_url())
            .json(&request)
            .send()
            .await
            .context("Failed to send subscription to gateway")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Gateway subscription failed with status {}: {}", status, body);
        }

        tracing::debug!(tags = tags.len(), interval_ms, "Gateway subscription accepted");
        Ok(())
    }
}
