// Ingestion pipeline - quantizes samples into the shared point buffer
use crate::application::retention::RetentionPolicy;
use crate::domain::point::{quantize, Merge, PointBuffer};
use crate::domain::sample::Sample;

/// Sole writer of the point buffer: samples, heartbeats and retention all go
/// through here.
#[derive(Debug)]
pub struct IngestionPipeline {
    buffer: PointBuffer,
    bucket_ms: i64,
    retention: RetentionPolicy,
}

impl IngestionPipeline {
    pub fn new(bucket_ms: i64, retention: RetentionPolicy) -> Self {
        Self {
            buffer: PointBuffer::new(),
            bucket_ms: bucket_ms.max(1),
            retention,
        }
    }

    pub fn buffer(&self) -> &PointBuffer {
        &self.buffer
    }

    pub fn bucket_ms(&self) -> i64 {
        self.bucket_ms
    }

    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    pub fn ingest(&mut self, sample: &Sample) -> Merge {
        let t = quantize(sample.timestamp, self.bucket_ms);
        let merge = self.buffer.merge(&sample.tag, sample.value.as_f64(), t);

        match merge {
            Merge::Updated { propagated } | Merge::Inserted { propagated } => {
                tracing::trace!(
                    tag = %sample.tag,
                    t,
                    propagated,
                    "Merged late sample"
                );
            }
            _ => {}
        }

        if merge.grew() {
            self.retention.apply(&mut self.buffer);
        }
        merge
    }

    /// Heartbeat: repeat the newest snapshot into the current bucket so a
    /// static value still draws a line. Returns true when a point was added.
    pub fn tick(&mut self, now: i64) -> bool {
        let qt = quantize(now, self.bucket_ms);
        if !self.buffer.repeat_last(qt) {
            return false;
        }
        self.retention.apply(&mut self.buffer);
        true
    }
}
