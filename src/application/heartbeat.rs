// Heartbeat synthesizer - keeps static series drawing at the bucket rate
use crate::application::engine::EngineHandle;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Queue a heartbeat every `period` until the engine stops.
pub fn spawn_heartbeat(engine: EngineHandle, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            match engine.try_tick() {
                Ok(true) => {}
                Ok(false) => tracing::trace!("Engine queue full, heartbeat skipped"),
                Err(_) => break,
            }
        }
        tracing::debug!("Heartbeat stopped");
    })
}
