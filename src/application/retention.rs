// Retention manager - keeps the point buffer bounded
use crate::domain::point::PointBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    max_points: usize,
}

impl RetentionPolicy {
    pub fn new(max_points: usize) -> Self {
        Self {
            max_points: max_points.max(1),
        }
    }

    /// Points needed to hold `retention_minutes` of buckets `bucket_ms` wide.
    pub fn from_minutes(retention_minutes: u64, bucket_ms: u64) -> Self {
        let bucket_ms = bucket_ms.max(1);
        let points = retention_minutes.saturating_mul(60_000) / bucket_ms;
        Self::new(usize::try_from(points).unwrap_or(usize::MAX))
    }

    pub fn max_points(&self) -> usize {
        self.max_points
    }

    /// Trim the oldest points beyond the limit. Returns the number dropped.
    pub fn apply(&self, buffer: &mut PointBuffer) -> usize {
        let dropped = buffer.trim_front(self.max_points);
        if dropped > 0 {
            tracing::debug!(dropped, retained = buffer.len(), "Trimmed point buffer");
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_minutes() {
        assert_eq!(RetentionPolicy::from_minutes(360, 100).max_points(), 216_000);
        assert_eq!(RetentionPolicy::from_minutes(1, 250).max_points(), 240);
        assert_eq!(RetentionPolicy::from_minutes(0, 100).max_points(), 1);
    }

    #[test]
    fn test_apply_trims_oldest() {
        let mut buffer = PointBuffer::new();
        for i in 0..5 {
            buffer.merge("A", i as f64, i * 100);
        }
        let policy = RetentionPolicy::new(3);
        assert_eq!(policy.apply(&mut buffer), 2);
        assert_eq!(buffer.iter().next().map(|p| p.t), Some(200));
        assert_eq!(policy.apply(&mut buffer), 0);
    }
}
