// Subscription control - asks the data source to start sending tags
use async_trait::async_trait;

#[async_trait]
pub trait SubscriptionClient: Send + Sync {
    /// Request samples for `tags` every `interval_ms`
    async fn subscribe(&self, tags: &[String], interval_ms: u64) -> anyhow::Result<()>;
}

/// Source used when samples only arrive over HTTP.
#[derive(Debug, Clone, Default)]
pub struct DetachedSource;

#[async_trait]
impl SubscriptionClient for DetachedSource {
    async fn subscribe(&self, tags: &[String], interval_ms: u64) -> anyhow::Result<()> {
        tracing::debug!(
            tags = tags.len(),
            interval_ms,
            "No source attached, subscription ignored"
        );
        Ok(())
    }
}
