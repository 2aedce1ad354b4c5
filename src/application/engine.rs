// Engine coordinator - one task owns the point buffer and the chart registry
use crate::application::chart_registry::ChartRegistry;
use crate::application::ingestion::IngestionPipeline;
use crate::domain::chart::{Chart, ChartSeries, ValueKind};
use crate::domain::point::Point;
use crate::domain::sample::Sample;
use crate::domain::window::{resolve, TimeDomain};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

pub trait Clock: Send + Sync {
    /// Epoch milliseconds
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine is not running")]
    Stopped,
    #[error("failed to encode window: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Legend entry with the label and visibility already resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesView {
    pub tag: String,
    pub label: String,
    pub value_kind: Option<ValueKind>,
    pub visible: bool,
    pub color: Option<String>,
}

impl From<&ChartSeries> for SeriesView {
    fn from(series: &ChartSeries) -> Self {
        Self {
            tag: series.tag.clone(),
            label: series.display_label().to_string(),
            value_kind: series.value_kind,
            visible: series.is_visible(),
            color: series.color.clone(),
        }
    }
}

/// Everything a chart needs for one redraw, borrowed from the engine state.
#[derive(Debug, Serialize)]
pub struct ChartWindow<'a> {
    pub chart_id: &'a str,
    pub domain: TimeDomain,
    pub visible: Vec<&'a Point>,
    pub series: Vec<SeriesView>,
}

#[derive(Debug)]
pub struct EngineState {
    pub pipeline: IngestionPipeline,
    pub registry: ChartRegistry,
}

impl EngineState {
    pub fn new(pipeline: IngestionPipeline, registry: ChartRegistry) -> Self {
        Self { pipeline, registry }
    }

    pub fn window(&self, chart_id: &str, now: i64) -> Option<ChartWindow<'_>> {
        let chart = self.registry.chart(chart_id)?;
        let window = resolve(chart, self.pipeline.buffer(), now);
        Some(ChartWindow {
            chart_id: &chart.id,
            domain: window.domain,
            visible: window.visible,
            series: chart.series.iter().map(SeriesView::from).collect(),
        })
    }
}

type Job = Box<dyn FnOnce(&mut EngineState, i64) + Send>;

enum Command {
    Ingest(Vec<Sample>),
    Tick,
    Run(Job),
}

/// Cheap cloneable entry point. Commands run one at a time, in the order they
/// were queued, so readers always see a complete state.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<Command>,
}

impl EngineHandle {
    pub async fn ingest(&self, samples: Vec<Sample>) -> Result<(), EngineError> {
        if samples.is_empty() {
            return Ok(());
        }
        self.tx
            .send(Command::Ingest(samples))
            .await
            .map_err(|_| EngineError::Stopped)
    }

    /// Queue a heartbeat without waiting. A full queue skips this tick; the
    /// next one lands in a later bucket anyway. Returns whether it was queued.
    pub fn try_tick(&self) -> Result<bool, EngineError> {
        match self.tx.try_send(Command::Tick) {
            Ok(()) => Ok(true),
            Err(mpsc::error::TrySendError::Full(_)) => Ok(false),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(EngineError::Stopped),
        }
    }

    /// Run `f` on the engine task with the current time and return its result.
    pub async fn call<R, F>(&self, f: F) -> Result<R, EngineError>
    where
        R: Send + 'static,
        F: FnOnce(&mut EngineState, i64) -> R + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |state, now| {
            let _ = reply_tx.send(f(state, now));
        });
        self.tx
            .send(Command::Run(job))
            .await
            .map_err(|_| EngineError::Stopped)?;
        reply_rx.await.map_err(|_| EngineError::Stopped)
    }

    pub async fn charts(&self) -> Result<Vec<Chart>, EngineError> {
        self.call(|state, _| state.registry.charts().to_vec()).await
    }

    /// The chart's window encoded as JSON on the engine task, so points are
    /// never copied out of the buffer. `None` when the chart does not exist.
    pub async fn window_json(&self, chart_id: String) -> Result<Option<Vec<u8>>, EngineError> {
        self.call(move |state, now| {
            state
                .window(&chart_id, now)
                .map(|window| serde_json::to_vec(&window))
                .transpose()
        })
        .await?
        .map_err(EngineError::from)
    }

    pub async fn activate_workspace(
        &self,
        workspace_id: String,
        saved: Vec<Chart>,
    ) -> Result<(), EngineError> {
        self.call(move |state, _| state.registry.activate_workspace(workspace_id, saved))
            .await
    }
}

pub struct Engine {
    state: EngineState,
    clock: Arc<dyn Clock>,
    rx: mpsc::Receiver<Command>,
}

impl Engine {
    pub fn spawn(
        state: EngineState,
        clock: Arc<dyn Clock>,
        queue: usize,
    ) -> (EngineHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(queue.max(1));
        let engine = Self { state, clock, rx };
        let task = tokio::spawn(engine.run());
        (EngineHandle { tx }, task)
    }

    async fn run(mut self) {
        tracing::info!(
            bucket_ms = self.state.pipeline.bucket_ms(),
            retention_points = self.state.pipeline.retention().max_points(),
            "Engine started"
        );
        while let Some(command) = self.rx.recv().await {
            let now = self.clock.now_ms();
            match command {
                Command::Ingest(samples) => {
                    for sample in &samples {
                        self.state.pipeline.ingest(sample);
                    }
                }
                Command::Tick => {
                    self.state.pipeline.tick(now);
                }
                Command::Run(job) => job(&mut self.state, now),
            }
        }
        tracing::info!("Engine stopped");
    }
}
