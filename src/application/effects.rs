// Effect dispatcher - fire-and-forget persistence and subscription calls
use crate::application::chart_store::ChartStore;
use crate::application::subscription::SubscriptionClient;
use crate::domain::chart::Chart;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Persist {
        workspace_id: String,
        charts: Vec<Chart>,
    },
    Subscribe {
        tags: Vec<String>,
        interval_ms: u64,
    },
}

/// Sending half handed to the registry. Sending never blocks and never fails
/// from the caller's point of view.
#[derive(Debug, Clone)]
pub struct EffectSender {
    tx: mpsc::UnboundedSender<Effect>,
}

impl EffectSender {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Effect>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn persist(&self, workspace_id: String, charts: Vec<Chart>) {
        self.send(Effect::Persist {
            workspace_id,
            charts,
        });
    }

    pub fn subscribe(&self, tags: Vec<String>, interval_ms: u64) {
        if tags.is_empty() {
            return;
        }
        self.send(Effect::Subscribe { tags, interval_ms });
    }

    fn send(&self, effect: Effect) {
        if self.tx.send(effect).is_err() {
            tracing::debug!("Effect dispatcher gone, dropping effect");
        }
    }
}

/// Drain effects in order. Failures are logged and dropped so a broken store
/// or source never stalls the engine.
pub async fn run_dispatcher(
    mut rx: mpsc::UnboundedReceiver<Effect>,
    store: Arc<dyn ChartStore>,
    source: Arc<dyn SubscriptionClient>,
) {
    while let Some(effect) = rx.recv().await {
        match effect {
            Effect::Persist {
                workspace_id,
                charts,
            } => {
                if let Err(e) = store.save_charts(&workspace_id, &charts).await {
                    tracing::warn!(workspace = %workspace_id, "Failed to persist charts: {:#}", e);
                }
            }
            Effect::Subscribe { tags, interval_ms } => {
                if let Err(e) = source.subscribe(&tags, interval_ms).await {
                    tracing::warn!(tags = tags.len(), "Subscription request failed: {:#}", e);
                }
            }
        }
    }
    tracing::debug!("Effect dispatcher stopped");
}
