// Point buffer domain model - ordered, forward-filled multi-tag snapshots
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};

/// Round a timestamp down to the start of its bucket. Buckets below
/// `i64::MIN` clamp to it.
pub fn quantize(timestamp: i64, bucket_ms: i64) -> i64 {
    timestamp.div_euclid(bucket_ms).saturating_mul(bucket_ms)
}

/// One bucket-aligned snapshot of every tag observed so far.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub t: i64,
    pub values: BTreeMap<String, f64>,
}

impl Point {
    pub fn new(t: i64, values: BTreeMap<String, f64>) -> Self {
        Self { t, values }
    }

    pub fn value(&self, tag: &str) -> Option<f64> {
        self.values.get(tag).copied()
    }
}

/// How a sample landed in the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    /// First point of an empty buffer.
    Created,
    /// Same bucket as the newest point.
    SameBucket,
    /// New newest point, forward-filled from the previous one.
    Appended,
    /// Late sample hitting an existing bucket.
    Updated { propagated: usize },
    /// Late sample creating a bucket between existing ones.
    Inserted { propagated: usize },
}

impl Merge {
    pub fn grew(self) -> bool {
        matches!(self, Merge::Created | Merge::Appended | Merge::Inserted { .. })
    }
}

/// Points strictly ascending by `t`, no duplicate buckets.
#[derive(Debug, Clone, Default)]
pub struct PointBuffer {
    points: VecDeque<Point>,
}

impl PointBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&Point> {
        self.points.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Point> {
        self.points.iter()
    }

    /// Merge an already quantized value for `tag` at bucket `t`.
    pub fn merge(&mut self, tag: &str, value: f64, t: i64) -> Merge {
        let Some(last) = self.points.back_mut() else {
            let mut values = BTreeMap::new();
            values.insert(tag.to_string(), value);
            self.points.push_back(Point::new(t, values));
            return Merge::Created;
        };

        if last.t == t {
            last.values.insert(tag.to_string(), value);
            return Merge::SameBucket;
        }

        if t > last.t {
            let mut values = last.values.clone();
            values.insert(tag.to_string(), value);
            self.points.push_back(Point::new(t, values));
            return Merge::Appended;
        }

        match self.points.binary_search_by_key(&t, |p| p.t) {
            Ok(idx) => {
                self.points[idx].values.insert(tag.to_string(), value);
                let propagated = self.propagate(idx, tag, value);
                Merge::Updated { propagated }
            }
            Err(idx) => {
                let mut values = match idx.checked_sub(1) {
                    Some(prev) => self.points[prev].values.clone(),
                    None => BTreeMap::new(),
                };
                values.insert(tag.to_string(), value);
                self.points.insert(idx, Point::new(t, values));
                let propagated = self.propagate(idx, tag, value);
                Merge::Inserted { propagated }
            }
        }
    }

    /// Carry `value` forward from `idx` until the first point that already
    /// holds something else for `tag`. That point is a later change boundary
    /// and is left alone.
    fn propagate(&mut self, idx: usize, tag: &str, value: f64) -> usize {
        let mut written = 0;
        for point in self.points.range_mut(idx + 1..) {
            match point.values.get_mut(tag) {
                Some(existing) if *existing == value => {
                    *existing = value;
                    written += 1;
                }
                _ => break,
            }
        }
        written
    }

    /// Clone the newest point into bucket `qt`. Returns false when the buffer
    /// is empty or `qt` is not after the newest bucket.
    pub fn repeat_last(&mut self, qt: i64) -> bool {
        let Some(last) = self.points.back() else {
            return false;
        };
        if qt <= last.t {
            return false;
        }
        let values = last.values.clone();
        self.points.push_back(Point::new(qt, values));
        true
    }

    /// Drop the oldest points so at most `max` remain. Returns how many went.
    pub fn trim_front(&mut self, max: usize) -> usize {
        let excess = self.points.len().saturating_sub(max);
        if excess > 0 {
            self.points.drain(..excess);
        }
        excess
    }

    /// Points with `from <= t <= to`.
    pub fn range(&self, from: i64, to: i64) -> impl Iterator<Item = &Point> {
        let start = self.points.partition_point(|p| p.t < from);
        let end = self.points.partition_point(|p| p.t <= to).max(start);
        self.points.range(start..end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn snapshot(buffer: &PointBuffer) -> Vec<(i64, Vec<(&str, f64)>)> {
        buffer
            .iter()
            .map(|p| (p.t, p.values.iter().map(|(k, v)| (k.as_str(), *v)).collect()))
            .collect()
    }

    #[test]
    fn test_quantize_floors_to_bucket() {
        assert_eq!(quantize(1000, 100), 1000);
        assert_eq!(quantize(1099, 100), 1000);
        assert_eq!(quantize(1100, 100), 1100);
        assert_eq!(quantize(-1, 100), -100);
    }

    #[test]
    fn test_quantize_extremes_do_not_overflow() {
        assert_eq!(quantize(i64::MIN, 100), i64::MIN);
        assert_eq!(quantize(i64::MAX, 100), 9_223_372_036_854_775_800);

        let mut buffer = PointBuffer::new();
        buffer.merge("A", 1.0, quantize(i64::MIN, 100));
        buffer.merge("A", 2.0, quantize(i64::MAX, 100));
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_same_bucket_merges_tags() {
        let mut buffer = PointBuffer::new();
        assert_eq!(buffer.merge("A", 5.0, 1000), Merge::Created);
        assert_eq!(buffer.merge("B", 7.0, 1000), Merge::SameBucket);

        assert_eq!(snapshot(&buffer), vec![(1000, vec![("A", 5.0), ("B", 7.0)])]);
    }

    #[test]
    fn test_in_order_append() {
        let mut buffer = PointBuffer::new();
        buffer.merge("A", 1.0, 1000);
        assert_eq!(buffer.merge("A", 2.0, 2000), Merge::Appended);

        assert_eq!(
            snapshot(&buffer),
            vec![(1000, vec![("A", 1.0)]), (2000, vec![("A", 2.0)])]
        );
    }

    #[test]
    fn test_append_forward_fills_other_tags() {
        let mut buffer = PointBuffer::new();
        buffer.merge("A", 1.0, 1000);
        buffer.merge("B", 3.0, 1000);
        buffer.merge("A", 2.0, 1100);

        assert_eq!(buffer.last().unwrap().value("B"), Some(3.0));
    }

    #[test]
    fn test_out_of_order_insert_fills_from_predecessor() {
        let mut buffer = PointBuffer::new();
        buffer.merge("A", 1.0, 1000);
        buffer.merge("B", 3.0, 1000);
        buffer.merge("A", 2.0, 2000);

        let merge = buffer.merge("A", 9.0, 1500);
        assert_eq!(merge, Merge::Inserted { propagated: 0 });
        assert_eq!(
            snapshot(&buffer),
            vec![
                (1000, vec![("A", 1.0), ("B", 3.0)]),
                (1500, vec![("A", 9.0), ("B", 3.0)]),
                (2000, vec![("A", 2.0), ("B", 3.0)]),
            ]
        );
    }

    #[test]
    fn test_insert_before_first_point_has_no_predecessor() {
        let mut buffer = PointBuffer::new();
        buffer.merge("A", 1.0, 1000);
        buffer.merge("B", 2.0, 500);

        assert_eq!(
            snapshot(&buffer),
            vec![(500, vec![("B", 2.0)]), (1000, vec![("A", 1.0)])]
        );
    }

    #[test]
    fn test_late_update_of_existing_bucket_stops_at_change_boundary() {
        let mut buffer = PointBuffer::new();
        buffer.merge("A", 1.0, 1000);
        buffer.merge("A", 1.0, 1100);
        buffer.merge("A", 4.0, 1200);

        let merge = buffer.merge("A", 7.0, 1000);
        assert_eq!(merge, Merge::Updated { propagated: 0 });
        let values: Vec<Option<f64>> = buffer.iter().map(|p| p.value("A")).collect();
        assert_eq!(values, vec![Some(7.0), Some(1.0), Some(4.0)]);
    }

    #[test]
    fn test_propagation_walks_equal_values() {
        let mut buffer = PointBuffer::new();
        buffer.merge("A", 2.0, 1000);
        buffer.merge("A", 2.0, 1100);
        buffer.merge("A", 2.0, 1200);
        buffer.merge("A", 3.0, 1300);

        assert_eq!(buffer.merge("A", 2.0, 1050), Merge::Inserted { propagated: 2 });
        assert_eq!(buffer.len(), 5);
    }

    #[test]
    fn test_propagation_stops_where_tag_is_absent() {
        let mut buffer = PointBuffer::new();
        buffer.merge("B", 1.0, 1000);
        buffer.merge("B", 2.0, 1100);

        buffer.merge("A", 5.0, 1000);
        let values: Vec<Option<f64>> = buffer.iter().map(|p| p.value("A")).collect();
        assert_eq!(values, vec![Some(5.0), None]);
    }

    #[test]
    fn test_repeat_last() {
        let mut buffer = PointBuffer::new();
        assert!(!buffer.repeat_last(1000));

        buffer.merge("A", 1.0, 1000);
        assert!(!buffer.repeat_last(1000));
        assert!(!buffer.repeat_last(900));
        assert!(buffer.repeat_last(1100));
        assert!(!buffer.repeat_last(1100));

        assert_eq!(
            snapshot(&buffer),
            vec![(1000, vec![("A", 1.0)]), (1100, vec![("A", 1.0)])]
        );
    }

    #[test]
    fn test_trim_front() {
        let mut buffer = PointBuffer::new();
        for i in 0..10 {
            buffer.merge("A", i as f64, i * 100);
        }
        assert_eq!(buffer.trim_front(4), 6);
        assert_eq!(buffer.iter().map(|p| p.t).collect::<Vec<_>>(), vec![600, 700, 800, 900]);
        assert_eq!(buffer.trim_front(4), 0);
    }

    #[test]
    fn test_range_is_inclusive() {
        let mut buffer = PointBuffer::new();
        for i in 0..10 {
            buffer.merge("A", i as f64, i * 100);
        }
        let ts: Vec<i64> = buffer.range(200, 500).map(|p| p.t).collect();
        assert_eq!(ts, vec![200, 300, 400, 500]);

        assert_eq!(buffer.range(950, 2000).count(), 0);
        assert_eq!(buffer.range(500, 200).count(), 0);
        assert_eq!(PointBuffer::new().range(0, 1000).count(), 0);
    }

    #[test]
    fn test_random_merges_keep_buffer_strictly_ordered() {
        let mut rng = StdRng::seed_from_u64(7);
        let tags = ["A", "B", "C", "D"];
        let mut buffer = PointBuffer::new();

        for _ in 0..2_000 {
            let tag = tags[rng.random_range(0..tags.len())];
            let t = quantize(rng.random_range(0..50_000), 100);
            let value = rng.random_range(0..5) as f64;
            buffer.merge(tag, value, t);
        }

        let ts: Vec<i64> = buffer.iter().map(|p| p.t).collect();
        assert!(ts.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_in_order_merges_forward_fill_untouched_tags() {
        let mut rng = StdRng::seed_from_u64(11);
        let tags = ["A", "B", "C"];
        let mut buffer = PointBuffer::new();
        let mut updates: Vec<(i64, &str)> = Vec::new();
        let mut now = 0;

        for _ in 0..1_000 {
            now += rng.random_range(0..3) * 100;
            let tag = tags[rng.random_range(0..tags.len())];
            buffer.merge(tag, rng.random_range(0..100) as f64, now);
            updates.push((now, tag));
        }

        let points: Vec<&Point> = buffer.iter().collect();
        for pair in points.windows(2) {
            let (p1, p2) = (pair[0], pair[1]);
            for (tag, value) in &p1.values {
                let touched = updates.iter().any(|(t, u)| *t == p2.t && *u == tag.as_str());
                if !touched {
                    assert_eq!(p2.value(tag), Some(*value), "tag {} at {}", tag, p2.t);
                }
            }
        }
    }
}
