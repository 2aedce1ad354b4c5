// Simulated data source - synthetic signals for running without a server
use crate::application::engine::{Clock, EngineHandle};
use crate::application::subscription::SubscriptionClient;
use crate::domain::chart::TagNode;
use crate::domain::sample::{Sample, SampleValue};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::f64::consts::PI;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

const PHASE_STEP: f64 = 0.1;

const SIMULATED_TAGS: [(&str, &str, &str); 8] = [
    ("ns=1;s=Bool1", "Bool1", "Boolean"),
    ("ns=1;s=Sine1", "Sine1", "Double"),
    ("ns=1;s=Square1", "Square1", "Double"),
    ("ns=1;s=Random1", "Random1", "Double"),
    ("ns=1;s=Step1", "Step1", "Double"),
    ("ns=1;s=Noise1", "Noise1", "Double"),
    ("ns=1;s=Ramp1", "Ramp1", "Double"),
    ("ns=1;s=Triangle1", "Triangle1", "Double"),
];

/// Nodes the simulator can produce, for clients browsing what to chart.
pub fn simulated_nodes() -> Vec<TagNode> {
    SIMULATED_TAGS
        .iter()
        .map(|(tag, name, data_type)| TagNode {
            tag: tag.to_string(),
            browse_name: name.to_string(),
            is_variable: true,
            data_type: Some(data_type.to_string()),
        })
        .collect()
}

/// Value of a simulated tag at `phase` and wall time `t` (epoch ms).
pub fn simulated_value(tag: &str, phase: f64, t: i64) -> SampleValue {
    let value = match tag {
        "ns=1;s=Bool1" => return SampleValue::Bool(phase.sin() > 0.0),
        "ns=1;s=Sine1" => phase.sin() * 50.0 + 50.0,
        "ns=1;s=Square1" => {
            if (phase.floor() as i64) % 2 != 0 {
                100.0
            } else {
                0.0
            }
        }
        "ns=1;s=Step1" => {
            if ((phase / 5.0).floor() as i64) % 2 != 0 {
                75.0
            } else {
                25.0
            }
        }
        "ns=1;s=Noise1" => 50.0 + (rand::random::<f64>() - 0.5) * 20.0,
        "ns=1;s=Ramp1" => (t as f64 / 1000.0) % 100.0,
        "ns=1;s=Triangle1" => 50.0 + 50.0 * (2.0 / PI) * phase.sin().asin(),
        _ => rand::random::<f64>() * 100.0,
    };
    SampleValue::Number(value)
}

#[derive(Default)]
struct Emitter {
    tags: BTreeSet<String>,
    task: Option<JoinHandle<()>>,
}

/// Emits every subscribed tag once per interval straight into the engine.
/// Later subscriptions add tags to the running emitter.
pub struct SimulatedSource {
    engine: EngineHandle,
    clock: Arc<dyn Clock>,
    emitter: Arc<Mutex<Emitter>>,
}

impl SimulatedSource {
    pub fn new(engine: EngineHandle, clock: Arc<dyn Clock>) -> Self {
        Self {
            engine,
            clock,
            emitter: Arc::new(Mutex::new(Emitter::default())),
        }
    }

    fn spawn_emitter(&self, interval_ms: u64) -> JoinHandle<()> {
        let engine = self.engine.clone();
        let clock = self.clock.clone();
        let emitter = self.emitter.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
            let mut phase = 0.0;
            loop {
                interval.tick().await;
                phase += PHASE_STEP;
                let t = clock.now_ms();
                let samples: Vec<Sample> = emitter
                    .lock()
                    .await
                    .tags
                    .iter()
                    .map(|tag| Sample {
                        tag: tag.clone(),
                        value: simulated_value(tag, phase, t),
                        timestamp: t,
                    })
                    .collect();
                if engine.ingest(samples).await.is_err() {
                    break;
                }
            }
            tracing::debug!("Simulation stopped");
        })
    }
}

#[async_trait]
impl SubscriptionClient for SimulatedSource {
    async fn subscribe(&self, tags: &[String], interval_ms: u64) -> anyhow::Result<()> {
        let mut emitter = self.emitter.lock().await;
        emitter.tags.extend(tags.iter().cloned());
        if emitter.task.is_none() {
            tracing::info!(interval_ms, "Starting simulated source");
            emitter.task = Some(self.spawn_emitter(interval_ms));
        }
        tracing::debug!(tags = emitter.tags.len(), "Simulated tags updated");
        Ok(())
    }
}

impl Drop for SimulatedSource {
    fn drop(&mut self) {
        if let Ok(mut emitter) = self.emitter.try_lock() {
            if let Some(task) = emitter.task.take() {
                task.abort();
            }
        }
    }
}
